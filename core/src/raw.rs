//! Wire-shaped data the driver hands back from a network fetch, before it is
//! wrapped into a domain [`interceptor_types::Response`].

/// Raw bytes from a single network fetch, as delivered by the driver.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// What the interceptor decided to hand back to the driver for fulfillment.
#[derive(Debug, Clone)]
pub struct FulfillDecision {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}
