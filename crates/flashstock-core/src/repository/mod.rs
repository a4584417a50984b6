mod postgres;

pub use postgres::{
    create_pool, AuditRepository, Database, Order, OrderLine, OrderRepository,
    PostgresAuditRepository, PostgresOrderRepository,
};
