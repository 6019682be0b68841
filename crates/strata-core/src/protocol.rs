//! Client/server messages and their wire encoding
//!
//! Frames are bincode (serde, standard config) compressed with lz4 (size-prepended).

use glam::IVec2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::EntityTransform;
use crate::tiles::CHUNK_AREA;
use crate::world::{BiomeType, ChunkData};

/// Identifies one connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub u32);

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("payload for chunk ({}, {}) has {field} of length {actual}, expected {expected}", coord.x, coord.y)]
    SizeMismatch {
        coord: IVec2,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("failed to encode message: {0}")]
    Encode(String),

    #[error("failed to decode message: {0}")]
    Decode(String),

    #[error("failed to decompress frame: {0}")]
    Decompress(#[from] lz4_flex::block::DecompressError),
}

/// Flattened transfer form of one chunk (row-major, `CHUNK_AREA` long tile arrays)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub coord: IVec2,
    pub ground_ids: Vec<u16>,
    pub ore_ids: Vec<u16>,
    pub durabilities: Vec<i16>,
    pub entity_ids: Vec<u64>,
}

impl ChunkPayload {
    pub fn from_chunk(chunk: &ChunkData, entity_ids: Vec<u64>) -> Self {
        Self {
            coord: chunk.coord,
            ground_ids: chunk.ground_ids().to_vec(),
            ore_ids: chunk.ore_ids().to_vec(),
            durabilities: chunk.durabilities().to_vec(),
            entity_ids,
        }
    }

    /// Reject payloads whose tile arrays are not exactly one chunk long
    pub fn validate(&self) -> Result<(), ProtocolError> {
        let fields = [
            ("ground_ids", self.ground_ids.len()),
            ("ore_ids", self.ore_ids.len()),
            ("durabilities", self.durabilities.len()),
        ];
        for (field, actual) in fields {
            if actual != CHUNK_AREA {
                return Err(ProtocolError::SizeMismatch {
                    coord: self.coord,
                    field,
                    expected: CHUNK_AREA,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Client -> server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// One batch of chunk requests; `origin_chunk` is the client's current chunk
    RequestChunks {
        coordinates: Vec<IVec2>,
        origin_chunk: IVec2,
    },
    SetTile {
        cell: IVec2,
        tile_id: u16,
    },
    DamageTile {
        cell: IVec2,
        amount: i16,
    },
    Disconnect,
}

/// Server -> client(s)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Every payload of one request batch
    DeliverChunks { payloads: Vec<ChunkPayload> },
    TileChanged { cell: IVec2, tile_id: u16 },
    DurabilityChanged { cell: IVec2, durability: i16 },
    BiomeChanged { coord: IVec2, biome: BiomeType },
    EntitySpawned {
        id: u64,
        entity_type: u16,
        transform: EntityTransform,
    },
    EntityDespawned { id: u64 },
}

/// Serialize and compress a message into one frame
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, ProtocolError> {
    let serialized = bincode_next::serde::encode_to_vec(message, bincode_next::config::standard())
        .map_err(|e| ProtocolError::Encode(e.to_string()))?;
    Ok(lz4_flex::compress_prepend_size(&serialized))
}

/// Inverse of [`encode`]
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, ProtocolError> {
    let decompressed = lz4_flex::decompress_size_prepended(frame)?;
    let (message, _) =
        bincode_next::serde::decode_from_slice(&decompressed, bincode_next::config::standard())
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiles::TileId;

    #[test]
    fn test_payload_from_chunk() {
        let mut chunk = ChunkData::new(IVec2::new(1, -1));
        chunk.set_ground(2, 3, TileId::DIRT).unwrap();
        let payload = ChunkPayload::from_chunk(&chunk, vec![7]);
        assert!(payload.validate().is_ok());
        assert_eq!(payload.ground_ids[3 * 16 + 2], TileId::DIRT);
        assert_eq!(payload.entity_ids, vec![7]);
    }

    #[test]
    fn test_payload_size_mismatch() {
        let chunk = ChunkData::new(IVec2::ZERO);
        let mut payload = ChunkPayload::from_chunk(&chunk, Vec::new());
        payload.durabilities.pop();
        match payload.validate() {
            Err(ProtocolError::SizeMismatch { field, actual, .. }) => {
                assert_eq!(field, "durabilities");
                assert_eq!(actual, CHUNK_AREA - 1);
            }
            other => panic!("expected size mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_frame_roundtrip_deliver_chunks() {
        let chunk = ChunkData::new(IVec2::new(-4, 9));
        let message = ServerMessage::DeliverChunks {
            payloads: vec![ChunkPayload::from_chunk(&chunk, vec![1, 2])],
        };
        let frame = encode(&message).unwrap();
        // An all-air chunk compresses well
        assert!(frame.len() < CHUNK_AREA * 2);
        let decoded: ServerMessage = decode(&frame).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_corrupt_frame_rejected() {
        let frame = encode(&ClientMessage::Disconnect).unwrap();
        assert!(decode::<ClientMessage>(&frame[..2]).is_err());
        assert!(decode::<ClientMessage>(&[10, 0, 0, 0, 0xFF]).is_err());
    }
}
