//! Block aggregation
//!
//! A block is a contiguous register range transferred in one transport
//! operation. Its layout is fixed when the schema is built; at runtime the
//! aggregator only slices buffers and runs the codec.
//!
//! # Design Principles
//! - **All or nothing**: `decode` stages every member before touching the model
//! - **Gaps are not ours**: unclaimed registers get the caller's fill word or
//!   keep whatever the caller's buffer already holds
//! - **Schema errors only**: a wrong buffer length is a bug in the caller

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{RegMapError, Result};
use crate::metadata::{FieldId, FieldRegistry};
use crate::model::DeviceModel;
use crate::schema::{BlockSpec, DeviceKind, DeviceSchema};
use crate::value::RegisterValue;

// ============================================================================
// Layout
// ============================================================================

/// One field's placement inside a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockMember<F> {
    pub field: F,
    /// Offset from the block base
    pub relative_offset: u16,
    pub length: u16,
}

impl<F> BlockMember<F> {
    fn range(&self) -> std::ops::Range<usize> {
        let start = usize::from(self.relative_offset);
        start..start + usize::from(self.length)
    }
}

/// Contiguous register range and the fields inside it
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDescriptor<F> {
    pub name: &'static str,
    pub base_offset: u16,
    pub register_count: u16,
    /// Sorted by relative offset, never overlapping
    pub members: Vec<BlockMember<F>>,
}

impl<F: FieldId> BlockDescriptor<F> {
    /// Derive a block's members from the fields whose ranges fall inside it
    pub fn infer(spec: &BlockSpec, registry: &FieldRegistry<F>) -> Result<Self> {
        let start = u32::from(spec.base);
        let end = start + u32::from(spec.count);
        if end > u32::from(u16::MAX) + 1 {
            return Err(RegMapError::AddressOverflow {
                offset: spec.base,
                length: u32::from(spec.count),
            });
        }

        let mut members = Vec::new();
        for (field, meta) in registry.iter() {
            if meta.within(spec.base, spec.count) {
                members.push(BlockMember {
                    field,
                    relative_offset: meta.offset - spec.base,
                    length: meta.length,
                });
            } else if u32::from(meta.offset) < end && meta.end() > start {
                return Err(RegMapError::BlockStraddle {
                    field: field.name().to_string(),
                    block: spec.name.to_string(),
                });
            }
        }

        members.sort_by_key(|m| m.relative_offset);
        for pair in members.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if u32::from(first.relative_offset) + u32::from(first.length)
                > u32::from(second.relative_offset)
            {
                return Err(RegMapError::OverlappingMembers {
                    block: spec.name.to_string(),
                    first: first.field.name().to_string(),
                    second: second.field.name().to_string(),
                });
            }
        }

        Ok(Self {
            name: spec.name,
            base_offset: spec.base,
            register_count: spec.count,
            members,
        })
    }

    /// Placement of a field in this block, if it is a member
    pub fn member(&self, field: F) -> Option<&BlockMember<F>> {
        self.members.iter().find(|m| m.field == field)
    }

    /// Relative offsets of registers not claimed by any member
    pub fn gaps(&self) -> Vec<u16> {
        let mut claimed = vec![false; usize::from(self.register_count)];
        for member in &self.members {
            claimed[member.range()].iter_mut().for_each(|c| *c = true);
        }
        (0..self.register_count)
            .filter(|i| !claimed[usize::from(*i)])
            .collect()
    }

    fn check_len(&self, actual: usize) -> Result<()> {
        let expected = usize::from(self.register_count);
        if actual != expected {
            return Err(RegMapError::BufferLengthMismatch {
                block: self.name.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

/// One transport read needed to refresh a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadRequest {
    pub block: &'static str,
    pub offset: u16,
    pub count: u16,
}

// ============================================================================
// Aggregator
// ============================================================================

/// Moves values between block buffers and a device model
pub struct BlockAggregator;

impl BlockAggregator {
    /// Demultiplex a block buffer into the model's fields
    ///
    /// Write-only members are skipped like gaps. Fails without touching the
    /// model if `buffer` is not exactly `register_count` long, or if the block
    /// has members but none of them is readable. Status is left alone; the
    /// caller decides what a completed cycle means.
    pub fn decode<K: DeviceKind>(
        model: &mut DeviceModel<K>,
        block: &BlockDescriptor<K::Field>,
        buffer: &[u16],
    ) -> Result<()> {
        block.check_len(buffer.len())?;
        let schema = model.schema();

        let mut staged = Vec::with_capacity(block.members.len());
        for member in &block.members {
            let meta = schema.registry().describe(member.field)?;
            if !meta.is_readable() {
                continue;
            }
            let order = schema.orders().order_for(meta.data_type);
            let value = RegisterValue::decode(meta.data_type, &buffer[member.range()], order)?;
            trace!("{}.{} = {}", block.name, member.field.name(), value);
            staged.push((member.field, value));
        }
        if staged.is_empty() {
            if let Some(first) = block.members.first() {
                return Err(RegMapError::NotReadable(first.field.name().to_string()));
            }
        }

        debug!(
            "Decoded block {} ({} fields from {} registers at {})",
            block.name,
            staged.len(),
            block.register_count,
            block.base_offset
        );
        model.apply(staged);
        Ok(())
    }

    /// Multiplex the model's fields into a fresh buffer
    ///
    /// Gap registers hold `fill`.
    pub fn encode<K: DeviceKind>(
        model: &DeviceModel<K>,
        block: &BlockDescriptor<K::Field>,
        fill: u16,
    ) -> Result<Vec<u16>> {
        let mut buffer = vec![fill; usize::from(block.register_count)];
        Self::encode_into(model, block, &mut buffer)?;
        Ok(buffer)
    }

    /// Overwrite member ranges of an existing buffer, leaving gaps verbatim
    ///
    /// Typical use is writing back over the last image read from the device.
    pub fn encode_into<K: DeviceKind>(
        model: &DeviceModel<K>,
        block: &BlockDescriptor<K::Field>,
        buffer: &mut [u16],
    ) -> Result<()> {
        block.check_len(buffer.len())?;
        let schema = model.schema();

        let mut encoded = Vec::with_capacity(block.members.len());
        for member in &block.members {
            let meta = schema.registry().describe(member.field)?;
            let order = schema.orders().order_for(meta.data_type);
            let words = model
                .get(member.field)
                .encode(meta.data_type, order)
                .map_err(|_| {
                    RegMapError::type_mismatch(
                        member.field.name(),
                        meta.data_type,
                        model.get(member.field).type_name(),
                    )
                })?;
            encoded.push((member.range(), words));
        }

        for (range, words) in encoded {
            buffer[range].copy_from_slice(&words);
        }
        Ok(())
    }

    /// Reads needed to refresh every block with at least one readable member
    pub fn read_plan<F: FieldId>(schema: &DeviceSchema<F>) -> Vec<ReadRequest> {
        schema
            .blocks()
            .iter()
            .filter(|block| {
                block.members.iter().any(|m| {
                    schema
                        .registry()
                        .is_readable(m.field)
                        .unwrap_or(false)
                })
            })
            .map(|block| ReadRequest {
                block: block.name,
                offset: block.base_offset,
                count: block.register_count,
            })
            .collect()
    }
}
