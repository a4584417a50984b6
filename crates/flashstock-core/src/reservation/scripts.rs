use once_cell::sync::Lazy;
use redis::Script;

/// Atomic check-and-decrement plus record/index write.
///
/// KEYS[1] = inventory:{sku}
/// KEYS[2] = reservation:{id}
/// KEYS[3] = expiring_reservations
/// ARGV[1] = quantity
/// ARGV[2] = reservation record, JSON-serialized
/// ARGV[3] = expires_at score (epoch seconds)
/// ARGV[4] = reservation id (zset member)
///
/// Returns "NOT_INITIALIZED", "INSUFFICIENT:<available>", or "OK".
pub static RESERVE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local inv_key = KEYS[1]
        local rsv_key = KEYS[2]
        local idx_key = KEYS[3]
        local qty = tonumber(ARGV[1])
        local rsv_json = ARGV[2]
        local score = ARGV[3]
        local rsv_id = ARGV[4]

        if redis.call('EXISTS', inv_key) == 0 then
            return 'NOT_INITIALIZED'
        end

        local available = tonumber(redis.call('GET', inv_key))
        if available < qty then
            return 'INSUFFICIENT:' .. available
        end

        redis.call('DECRBY', inv_key, qty)
        redis.call('SET', rsv_key, rsv_json)
        redis.call('ZADD', idx_key, score, rsv_id)
        return 'OK'
        "#,
    )
});

/// Atomic read-delete-restore used by both `cancel` and `expire`. Ownership
/// is checked only when `ARGV[2]` (user_id) is non-empty; `expire` passes
/// an empty string to skip the check.
///
/// KEYS[1] = reservation:{id}
/// KEYS[2] = expiring_reservations
/// ARGV[1] = reservation id (zset member)
/// ARGV[2] = user_id, or "" to skip the ownership check
///
/// Returns "ABSENT", "FORBIDDEN", or "OK:<record json>".
pub static CANCEL_OR_EXPIRE: Lazy<Script> = Lazy::new(|| {
    Script::new(
        r#"
        local rsv_key = KEYS[1]
        local idx_key = KEYS[2]
        local rsv_id = ARGV[1]
        local user_id = ARGV[2]

        local raw = redis.call('GET', rsv_key)
        if not raw then
            return 'ABSENT'
        end

        local record = cjson.decode(raw)
        if user_id ~= '' and record.user_id ~= user_id then
            return 'FORBIDDEN'
        end

        local inv_key = 'inventory:' .. record.sku
        redis.call('INCRBY', inv_key, record.quantity)
        redis.call('DEL', rsv_key)
        redis.call('ZREM', idx_key, rsv_id)
        return 'OK:' .. raw
        "#,
    )
});
