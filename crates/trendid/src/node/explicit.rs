use crate::{
    error::{Error, Result},
    id::mask,
};

/// Checks that `value` fits in `bits` bits (`0 <= value < 2^bits`).
///
/// # Errors
///
/// Returns [`Error::ValueOutOfRange`] naming `field` otherwise.
pub fn check_range(field: &'static str, value: u64, bits: u8) -> Result<u64> {
    let max = mask(bits);
    if value > max {
        return Err(Error::ValueOutOfRange { field, value, max });
    }
    Ok(value)
}

/// Combines a cluster number and a server number into one node identity,
/// cluster in the high bits.
///
/// # Errors
///
/// Returns [`Error::ValueOutOfRange`] if either part does not fit its width,
/// or [`Error::FieldTooWide`] if the widths add up to more than 64 bits.
///
/// # Example
///
/// ```
/// use trendid::cluster_server_node;
///
/// assert_eq!(cluster_server_node(3, 5, 6, 6).unwrap(), (3 << 6) | 5);
/// assert!(cluster_server_node(64, 0, 6, 6).is_err());
/// ```
pub fn cluster_server_node(cluster: u64, server: u64, cluster_bits: u8, server_bits: u8) -> Result<u64> {
    let bits = cluster_bits.saturating_add(server_bits);
    if bits > 64 {
        return Err(Error::FieldTooWide { field: "node", bits });
    }
    let cluster = check_range("cluster", cluster, cluster_bits)?;
    let server = check_range("server", server, server_bits)?;
    // `bits <= 64`, so the shift only reaches 64 when the cluster is empty.
    Ok(cluster.checked_shl(u32::from(server_bits)).unwrap_or(0) | server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cluster_bounds_are_exclusive_of_two_to_the_bits() {
        assert_eq!(cluster_server_node(63, 0, 6, 6), Ok(63 << 6));
        assert_eq!(
            cluster_server_node(64, 0, 6, 6),
            Err(Error::ValueOutOfRange {
                field: "cluster",
                value: 64,
                max: 63
            })
        );
    }

    #[test]
    fn server_bounds_are_exclusive_of_two_to_the_bits() {
        assert_eq!(cluster_server_node(0, 63, 6, 6), Ok(63));
        assert_eq!(
            cluster_server_node(0, 64, 6, 6),
            Err(Error::ValueOutOfRange {
                field: "server",
                value: 64,
                max: 63
            })
        );
    }

    #[test]
    fn zero_width_accepts_only_zero() {
        assert_eq!(check_range("node", 0, 0), Ok(0));
        assert!(check_range("node", 1, 0).is_err());
        assert_eq!(cluster_server_node(0, 5, 0, 4), Ok(5));
    }

    #[test]
    fn full_width_accepts_everything() {
        assert_eq!(check_range("node", u64::MAX, 64), Ok(u64::MAX));
        assert!(matches!(
            cluster_server_node(0, 0, 40, 30),
            Err(Error::FieldTooWide { field: "node", bits: 70 })
        ));
    }
}
