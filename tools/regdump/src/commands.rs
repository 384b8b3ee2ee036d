//! Device commands
//!
//! Each command runs against one built-in model type and produces a
//! serialisable report; rendering lives in `output`.

use std::collections::HashSet;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use regmap::bytes::hex_dump;
use regmap::devices::{DeviceType, EnergyMeter, PelletBoiler};
use regmap::{
    Access, BlockAggregator, DeviceKind, DeviceModel, FieldId, FieldReading, StatusCode,
};
use serde::Serialize;
use tracing::debug;

/// `name=value` argument of `encode --set`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub field: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected name=value, got '{s}'"))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(format!("missing field name in '{s}'"));
        }
        Ok(Self {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// What to do with the selected device
#[derive(Debug, Clone)]
pub enum DeviceAction {
    Layout,
    Decode { block: String, words: Vec<u16> },
    Encode {
        block: String,
        assignments: Vec<Assignment>,
        fill: u16,
    },
}

/// Result of one [`DeviceAction`]
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Layout(LayoutReport),
    Decode(DecodeReport),
    Encode(EncodeReport),
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DeviceSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub blocks: usize,
    pub fields: usize,
}

#[derive(Debug, Serialize)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: u16,
    pub length: u16,
    pub data_type: String,
    pub access: Access,
    pub order: String,
    pub scale: f64,
    pub unit: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BlockLayout {
    pub name: &'static str,
    pub base_offset: u16,
    pub register_count: u16,
    pub fields: Vec<FieldLayout>,
    /// Absolute addresses of registers no field covers
    pub gaps: Vec<u16>,
}

#[derive(Debug, Serialize)]
pub struct LayoutReport {
    pub device: &'static str,
    pub blocks: Vec<BlockLayout>,
}

#[derive(Debug, Serialize)]
pub struct DecodeReport {
    pub device: &'static str,
    pub block: &'static str,
    pub base_offset: u16,
    pub status: StatusCode,
    pub explanation: &'static str,
    pub fields: Vec<FieldReading>,
}

#[derive(Debug, Serialize)]
pub struct EncodeReport {
    pub device: &'static str,
    pub block: &'static str,
    pub base_offset: u16,
    pub words: Vec<u16>,
    pub hex: String,
}

// ============================================================================
// Dispatch
// ============================================================================

pub fn summaries() -> Result<Vec<DeviceSummary>> {
    DeviceType::ALL
        .iter()
        .map(|device| match device {
            DeviceType::PelletBoiler => summary::<PelletBoiler>(*device),
            DeviceType::EnergyMeter => summary::<EnergyMeter>(*device),
        })
        .collect()
}

pub fn execute(device: DeviceType, action: &DeviceAction) -> Result<Report> {
    debug!("Running {:?} on {}", action, device);
    match device {
        DeviceType::PelletBoiler => execute_for::<PelletBoiler>(action),
        DeviceType::EnergyMeter => execute_for::<EnergyMeter>(action),
    }
}

fn execute_for<K: DeviceKind>(action: &DeviceAction) -> Result<Report> {
    match action {
        DeviceAction::Layout => layout::<K>().map(Report::Layout),
        DeviceAction::Decode { block, words } => decode::<K>(block, words).map(Report::Decode),
        DeviceAction::Encode {
            block,
            assignments,
            fill,
        } => encode::<K>(block, assignments, *fill).map(Report::Encode),
    }
}

// ============================================================================
// Commands
// ============================================================================

fn summary<K: DeviceKind>(device: DeviceType) -> Result<DeviceSummary> {
    let schema = K::schema()?;
    Ok(DeviceSummary {
        name: schema.name(),
        description: device.description(),
        blocks: schema.blocks().len(),
        fields: schema.registry().len(),
    })
}

pub fn layout<K: DeviceKind>() -> Result<LayoutReport> {
    let schema = K::schema()?;
    let mut blocks = Vec::with_capacity(schema.blocks().len());

    for block in schema.blocks() {
        let mut fields = Vec::with_capacity(block.members.len());
        for member in &block.members {
            let meta = schema.registry().describe(member.field)?;
            fields.push(FieldLayout {
                name: member.field.name(),
                offset: meta.offset,
                length: meta.length,
                data_type: meta.data_type.to_string(),
                access: meta.access,
                order: schema.orders().order_for(meta.data_type).to_string(),
                scale: meta.scale,
                unit: meta.unit,
            });
        }
        blocks.push(BlockLayout {
            name: block.name,
            base_offset: block.base_offset,
            register_count: block.register_count,
            fields,
            gaps: block
                .gaps()
                .into_iter()
                .map(|rel| block.base_offset + rel)
                .collect(),
        });
    }

    Ok(LayoutReport {
        device: schema.name(),
        blocks,
    })
}

/// Decode a raw block dump into a fresh model
///
/// A complete dump decodes to `Good`; a dump of the wrong length is an error.
pub fn decode<K: DeviceKind>(block_name: &str, words: &[u16]) -> Result<DecodeReport> {
    let schema = K::schema()?;
    let block = schema.block(block_name)?;
    let mut model = DeviceModel::<K>::new()?;

    BlockAggregator::decode(&mut model, block, words).with_context(|| {
        format!(
            "Block {} of {} spans {} registers",
            block.name,
            schema.name(),
            block.register_count
        )
    })?;
    model.mark(StatusCode::Good);

    let members: HashSet<&str> = block
        .members
        .iter()
        .filter(|m| {
            schema
                .registry()
                .is_readable(m.field)
                .unwrap_or(false)
        })
        .map(|m| m.field.name())
        .collect();

    let snapshot = model.snapshot();
    Ok(DecodeReport {
        device: snapshot.device,
        block: block.name,
        base_offset: block.base_offset,
        status: snapshot.status,
        explanation: snapshot.explanation,
        fields: snapshot
            .fields
            .into_iter()
            .filter(|f| members.contains(f.name))
            .collect(),
    })
}

/// Encode a block from a fresh model with `assignments` applied
pub fn encode<K: DeviceKind>(
    block_name: &str,
    assignments: &[Assignment],
    fill: u16,
) -> Result<EncodeReport> {
    let schema = K::schema()?;
    let block = schema.block(block_name)?;
    let mut model = DeviceModel::<K>::new()?;

    for assignment in assignments {
        let field = model.field_by_name(&assignment.field)?;
        if block.member(field).is_none() {
            bail!(
                "Field {} is not part of block {}",
                field.name(),
                block.name
            );
        }
        model
            .set_from_str(field, &assignment.value)
            .with_context(|| format!("Cannot set {}", field.name()))?;
    }

    let words = BlockAggregator::encode(&model, block, fill)?;
    Ok(EncodeReport {
        device: schema.name(),
        block: block.name,
        base_offset: block.base_offset,
        hex: hex_dump(&words),
        words,
    })
}
