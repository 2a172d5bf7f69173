//! Protobuf message definitions
//!
//! Declared with `prost` derives so the field numbers and wire types are
//! visible here and no code generation step is needed.

/// First message on every connection.
#[derive(Clone, PartialEq, prost::Message)]
pub struct DirectoryMessage {
    #[prost(string, repeated, tag = "1")]
    pub symbols: Vec<String>,
    #[prost(string, repeated, tag = "2")]
    pub names: Vec<String>,
}

/// Every later message: packed 7-double records, concatenated.
#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateMessage {
    #[prost(double, repeated, tag = "1")]
    pub data: Vec<f64>,
}
