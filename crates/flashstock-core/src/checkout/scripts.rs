use once_cell::sync::Lazy;
use redis::Script;

/// Atomic optimistic delete used by `confirm`: absence and ownership checks
/// match `CANCEL_OR_EXPIRE`, but the counter is never restored — the units
/// are being sold, not released.
///
/// KEYS[1] = reservation:{id}
/// KEYS[2] = expiring_reservations
/// ARGV[1] = reservation id (zset member)
/// ARGV[2] = user_id
///
/// Returns "ABSENT", "FORBIDDEN", or "OK:<record json>".
pub static CONFIRM: Lazy<Script> = Lazy::new(|| {
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
        if record.user_id ~= user_id then
            return 'FORBIDDEN'
        end

        redis.call('DEL', rsv_key)
        redis.call('ZREM', idx_key, rsv_id)
        return 'OK:' .. raw
        "#,
    )
});
