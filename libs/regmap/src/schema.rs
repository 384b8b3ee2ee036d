//! Device schema: field registry, block layout and register orders
//!
//! A schema is built once per model type and lives in a `Lazy` static for the
//! rest of the process. Building validates everything a model definition can
//! get wrong, so a bad definition fails at startup.

use crate::block::BlockDescriptor;
use crate::bytes::{OrderPolicy, RegisterOrder};
use crate::error::{RegMapError, Result};
use crate::metadata::{FieldId, FieldMetadata, FieldRegistry};

/// Static declaration of one block: `(name, base, count)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpec {
    pub name: &'static str,
    pub base: u16,
    pub count: u16,
}

impl BlockSpec {
    pub const fn new(name: &'static str, base: u16, count: u16) -> Self {
        Self { name, base, count }
    }
}

/// Everything fixed at model-definition time
#[derive(Debug, Clone)]
pub struct DeviceSchema<F: FieldId> {
    name: &'static str,
    registry: FieldRegistry<F>,
    blocks: Vec<BlockDescriptor<F>>,
    orders: OrderPolicy,
}

impl<F: FieldId> DeviceSchema<F> {
    /// Build and validate a schema
    ///
    /// Block membership is inferred from which field ranges fall inside each
    /// block; see [`BlockDescriptor::infer`].
    pub fn build(
        name: &'static str,
        orders: OrderPolicy,
        fields: impl IntoIterator<Item = (F, FieldMetadata)>,
        blocks: &[BlockSpec],
    ) -> Result<Self> {
        let registry = FieldRegistry::build(fields)?;
        let blocks = blocks
            .iter()
            .map(|spec| BlockDescriptor::infer(spec, &registry))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(
            "Schema {} built: {} fields, {} blocks",
            name,
            registry.len(),
            blocks.len()
        );

        Ok(Self {
            name,
            registry,
            blocks,
            orders,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn registry(&self) -> &FieldRegistry<F> {
        &self.registry
    }

    pub fn orders(&self) -> OrderPolicy {
        self.orders
    }

    pub fn blocks(&self) -> &[BlockDescriptor<F>] {
        &self.blocks
    }

    /// Block by name
    pub fn block(&self, name: &str) -> Result<&BlockDescriptor<F>> {
        self.blocks
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| RegMapError::UnknownBlock(name.to_string()))
    }

    /// Field by name
    pub fn field(&self, name: &str) -> Result<F> {
        F::from_name(name).ok_or_else(|| RegMapError::UnknownField(name.to_string()))
    }

    /// Register order used for a field's declared type
    pub fn order_of(&self, field: F) -> Result<RegisterOrder> {
        self.registry
            .describe(field)
            .map(|m| self.orders.order_for(m.data_type))
    }

    /// Blocks that contain the field
    pub fn blocks_containing(&self, field: F) -> impl Iterator<Item = &BlockDescriptor<F>> + '_ {
        self.blocks.iter().filter(move |b| b.member(field).is_some())
    }
}

/// A model type: its field enum plus its schema
pub trait DeviceKind: Send + Sync + 'static {
    type Field: FieldId;

    /// Schema shared by all instances of this kind
    ///
    /// Implementations keep the built schema in a `Lazy` static, so this is
    /// a pointer read after the first call.
    fn schema() -> Result<&'static DeviceSchema<Self::Field>>;
}
