use alloy::primitives::{Address, U256};
use chrono::Utc;

pub fn now_naive() -> chrono::NaiveDateTime {
    Utc::now().naive_utc()
}

/// Unix seconds, used for phase derivation and broadcast timestamps.
pub fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Contract timestamps and ids are uint256 on chain but always fit in u64 in practice.
pub fn u256_to_u64(value: U256) -> Option<u64> {
    u64::try_from(value).ok()
}

pub fn u256_to_u64_saturating(value: U256) -> u64 {
    u256_to_u64(value).unwrap_or(u64::MAX)
}

/// Lowercase, 0x-prefixed form used for every address persisted or served.
pub fn address_to_string(address: Address) -> String {
    format!("{address:#x}")
}

/// The zero address is how the contracts report "no highest bidder yet".
pub fn non_zero_address(address: Address) -> Option<String> {
    (address != Address::ZERO).then(|| address_to_string(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_conversions_guard_overflow() {
        assert_eq!(u256_to_u64(U256::from(42u64)), Some(42));
        assert_eq!(u256_to_u64(U256::MAX), None);
        assert_eq!(u256_to_u64_saturating(U256::MAX), u64::MAX);
    }

    #[test]
    fn zero_address_maps_to_none() {
        assert_eq!(non_zero_address(Address::ZERO), None);
        let addr = Address::repeat_byte(0xab);
        assert_eq!(
            non_zero_address(addr).as_deref(),
            Some("0xabababababababababababababababababababab")
        );
    }
}
