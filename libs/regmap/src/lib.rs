//! Register mapping and codec layer
//!
//! Translates between a field device's banks of 16-bit registers and named,
//! strongly-typed fields, and batches scattered fields into few contiguous
//! transfers.
//!
//! # Architecture
//!
//! - **Codec** (`bytes`, `value`): typed values to/from register words under
//!   any byte/word order
//! - **Metadata** (`metadata`, `schema`): per-field offset, length and access,
//!   validated once per model type
//! - **Model** (`model`, `status`): live field values plus a status envelope
//! - **Blocks** (`block`, `batch`): contiguous read ranges and merged writes
//! - **Runtime** (`shared`, `poll`): lock-guarded publication and the poll
//!   cycle over an external transport
//!
//! ```
//! use regmap::devices::{BoilerField, PelletBoiler};
//! use regmap::{BlockAggregator, DeviceKind, DeviceModel};
//!
//! let schema = PelletBoiler::schema()?;
//! let mut boiler = DeviceModel::<PelletBoiler>::new()?;
//! let block = schema.block("measurements")?;
//!
//! let mut buffer = vec![0u16; usize::from(block.register_count)];
//! buffer[0] = 652;
//! BlockAggregator::decode(&mut boiler, block, &buffer)?;
//! assert_eq!(boiler.display(BoilerField::BoilerTemperature), "65.2");
//! # Ok::<(), regmap::RegMapError>(())
//! ```

pub mod batch;
pub mod block;
pub mod bytes;
pub mod devices;
pub mod error;
pub mod metadata;
pub mod model;
pub mod poll;
pub mod schema;
pub mod shared;
pub mod status;
pub mod value;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export core types
pub use batch::{WritePlanner, WriteRequest, MAX_WRITE_REGISTERS};
pub use block::{BlockAggregator, BlockDescriptor, BlockMember, ReadRequest};
pub use bytes::{BitFlags16, OrderPolicy, RegisterCodec, RegisterOrder};
pub use error::{RegMapError, Result};
pub use metadata::{Access, FieldId, FieldMetadata, FieldRegistry};
pub use model::{DeviceModel, DeviceSnapshot, FieldReading};
pub use poll::{DevicePoller, PollConfig, RegisterTransport, TransportError};
pub use schema::{BlockSpec, DeviceKind, DeviceSchema};
pub use shared::SharedModel;
pub use status::{Status, StatusCode};
pub use value::{DataType, RegisterValue};
