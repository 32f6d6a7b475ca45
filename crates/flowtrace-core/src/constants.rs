/// The maximum time-to-live value allowed.
///
/// The IP `ttl` is an u8 (0..255); probing is capped one below so that the
/// overrun sentinel (`ttl_max + 1`) always fits in the field.
pub const MAX_TTL: u8 = 254;
