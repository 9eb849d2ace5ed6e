mod errors;
mod resolve;
mod roundtrip;
mod routing;

/// Builders for raw tc message bodies.
mod helpers {
    use bytes::Bytes;
    use tc_nla::AttributeEncoder;

    pub const TCA_KIND: u16 = 1;
    pub const TCA_OPTIONS: u16 = 2;
    pub const TCA_STATS: u16 = 3;
    pub const TCA_XSTATS: u16 = 4;
    pub const TCA_STATS2: u16 = 7;
    pub const TCA_STAB: u16 = 8;
    pub const TCA_CHAIN: u16 = 11;

    /// Encodes `attrs` in the given order.
    pub fn message(attrs: &[(u16, &[u8])]) -> Bytes {
        let mut enc = AttributeEncoder::new();
        for (tag, value) in attrs {
            enc.append(*tag, value).unwrap();
        }
        enc.finish()
    }

    /// The value of a `TCA_KIND` attribute.
    pub fn kind(name: &str) -> Vec<u8> {
        let mut value = name.as_bytes().to_vec();
        value.push(0);
        value
    }

    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt::try_init();
    }
}
