//! Store/Retrieve request protocol
//!
//! The sender's identity is not part of the payload: the transport
//! authenticates the sender and passes its `PeerId` alongside the
//! request, and the core trusts it for tenant isolation.

use serde::{Deserialize, Serialize};

/// Store a value under an already-provisioned key in the sender's table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    /// Key of the row to overwrite
    pub key: i64,
    /// Value to store; `None` clears the row
    pub data: Option<String>,
}

/// Outcome of a Store request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreResponse {
    /// The request was accepted (the write itself is fire-and-forget)
    Ack,
    /// The sender has no storage allocated on this node
    NotAllocated,
}

/// Retrieve the value stored under a key in the sender's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Key of the row to read
    pub key: i64,
}

/// Outcome of a Retrieve request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrieveResponse {
    /// The stored value
    Found(String),
    /// Unknown sender, unknown key, or a cleared row - not distinguished
    NotFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_request_serde_round_trip() {
        let request = StoreRequest {
            key: 42,
            data: Some("payload".to_string()),
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: StoreRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }

    #[test]
    fn test_retrieve_response_serde_round_trip() {
        for response in [
            RetrieveResponse::Found("value".to_string()),
            RetrieveResponse::NotFound,
        ] {
            let json = serde_json::to_string(&response).unwrap();
            let back: RetrieveResponse = serde_json::from_str(&json).unwrap();
            assert_eq!(back, response);
        }
    }

    #[test]
    fn test_store_request_null_data() {
        let request: StoreRequest = serde_json::from_str(r#"{"key":7,"data":null}"#).unwrap();
        assert_eq!(request.key, 7);
        assert!(request.data.is_none());
    }
}
