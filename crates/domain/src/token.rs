use primitive_types::H160;

/// Account or contract address (token, pool, registry, router, depositor).
pub type Address = H160;

/// Builds a deterministic address from a small integer, handy for fixtures.
pub fn address_from_u64(value: u64) -> Address {
    H160::from_low_u64_be(value)
}
