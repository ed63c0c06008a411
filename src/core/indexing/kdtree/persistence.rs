// src/core/indexing/kdtree/persistence.rs

//! Binary layout of a persisted tree.
//!
//! ```text
//! header  : has_seed u8, [seed u64], dimension i32, metric i32
//! node    : type u8 (0 absent, 1 internal, 2 leaf), body, 169
//! body    : has_point u8, [point], size i64, depth i32, left node, right node
//! point   : id i64, length i32, count i32,
//!           values (n i32, n x f32), indices (n i32, n x i32), 167
//! trailer : 168
//! ```
//!
//! Leaves carry no point and two absent children. All integers are
//! little-endian.

use super::tree::{KdNode, KdTree, NodeId};
use super::MAX_DEPTH;
use crate::core::common::byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crate::core::common::traits::{DataDeserializer, DataSerializer};
use crate::core::common::OxiclusterError;
use crate::core::types::{Coordinates, Point};
use crate::core::vector::DistanceMetric;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

const POINT_SENTINEL: u8 = 167;
const TREE_SENTINEL: u8 = 168;
const NODE_SENTINEL: u8 = 169;

const NODE_ABSENT: u8 = 0;
const NODE_INTERNAL: u8 = 1;
const NODE_LEAF: u8 = 2;

fn to_i32(value: usize, what: &str) -> Result<i32, OxiclusterError> {
    i32::try_from(value).map_err(|_| {
        OxiclusterError::InvalidArgument(format!("{} {} does not fit in an i32", what, value))
    })
}

fn to_usize<T>(value: T, what: &str) -> Result<usize, OxiclusterError>
where
    T: Copy + std::fmt::Display,
    usize: TryFrom<T>,
{
    usize::try_from(value)
        .map_err(|_| OxiclusterError::CorruptIndex(format!("invalid {}: {}", what, value)))
}

fn expect_sentinel<R: Read>(reader: &mut R, expected: u8) -> Result<(), OxiclusterError> {
    let found = reader.read_u8()?;
    if found != expected {
        return Err(OxiclusterError::CorruptIndex(format!(
            "expected sentinel {} but found {}",
            expected, found
        )));
    }
    Ok(())
}

/// Encodes a single point.
pub struct PointCodec;

impl DataSerializer<Point> for PointCodec {
    fn serialize<W: Write>(point: &Point, writer: &mut W) -> Result<(), OxiclusterError> {
        let coordinates = point.coordinates();
        let values = coordinates.values();
        writer.write_i64::<LittleEndian>(point.id())?;
        writer.write_i32::<LittleEndian>(to_i32(coordinates.len(), "vector length")?)?;
        writer.write_i32::<LittleEndian>(to_i32(values.len(), "value count")?)?;

        writer.write_i32::<LittleEndian>(to_i32(values.len(), "value count")?)?;
        for value in values {
            writer.write_f32::<LittleEndian>(*value)?;
        }

        let indices = coordinates.indices().unwrap_or(&[]);
        writer.write_i32::<LittleEndian>(to_i32(indices.len(), "index count")?)?;
        for index in indices {
            writer.write_i32::<LittleEndian>(to_i32(*index, "index")?)?;
        }

        writer.write_u8(POINT_SENTINEL)?;
        Ok(())
    }
}

impl DataDeserializer<Point> for PointCodec {
    fn deserialize<R: Read>(reader: &mut R) -> Result<Point, OxiclusterError> {
        let id = reader.read_i64::<LittleEndian>()?;
        let length = to_usize(reader.read_i32::<LittleEndian>()?, "vector length")?;
        let count = to_usize(reader.read_i32::<LittleEndian>()?, "value count")?;

        let n_values = to_usize(reader.read_i32::<LittleEndian>()?, "value array length")?;
        if n_values != count {
            return Err(OxiclusterError::CorruptIndex(format!(
                "point {} declares {} values but stores {}",
                id, count, n_values
            )));
        }
        let values =
            (0..n_values).map(|_| reader.read_f32::<LittleEndian>()).collect::<Result<Vec<_>, _>>()?;

        let n_indices = to_usize(reader.read_i32::<LittleEndian>()?, "index array length")?;
        let mut indices = Vec::new();
        for _ in 0..n_indices {
            indices.push(to_usize(reader.read_i32::<LittleEndian>()?, "index")?);
        }
        expect_sentinel(reader, POINT_SENTINEL)?;

        let coordinates = if n_indices == 0 && count == length {
            Coordinates::Dense(values)
        } else if n_indices == count {
            Coordinates::sparse(length, indices, values)
                .map_err(|e| OxiclusterError::CorruptIndex(format!("point {}: {}", id, e)))?
        } else {
            return Err(OxiclusterError::CorruptIndex(format!(
                "point {} stores {} values but {} indices",
                id, count, n_indices
            )));
        };
        Ok(Point::new(id, coordinates))
    }
}

impl KdTree {
    /// Writes the tree in the layout described at the top of this module.
    ///
    /// # Errors
    ///
    /// `Io` on write failures, `InvalidArgument` if a count does not fit the
    /// 32-bit fields of the layout.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), OxiclusterError> {
        match self.seed {
            Some(seed) => {
                writer.write_u8(1)?;
                writer.write_u64::<LittleEndian>(seed)?;
            }
            None => writer.write_u8(0)?,
        }
        writer.write_i32::<LittleEndian>(to_i32(self.dimension, "dimension")?)?;
        writer.write_i32::<LittleEndian>(self.metric.code())?;
        self.write_node(writer, self.root)?;
        writer.write_u8(TREE_SENTINEL)?;
        Ok(())
    }

    fn write_node<W: Write>(&self, writer: &mut W, node: Option<NodeId>) -> Result<(), OxiclusterError> {
        match node.map(|id| &self.nodes[id]) {
            None => writer.write_u8(NODE_ABSENT)?,
            Some(KdNode::Leaf { depth }) => {
                writer.write_u8(NODE_LEAF)?;
                writer.write_u8(0)?;
                writer.write_i64::<LittleEndian>(0)?;
                writer.write_i32::<LittleEndian>(to_i32(*depth, "depth")?)?;
                self.write_node(writer, None)?;
                self.write_node(writer, None)?;
            }
            Some(&KdNode::Internal { point, left, right, size, depth }) => {
                writer.write_u8(NODE_INTERNAL)?;
                writer.write_u8(1)?;
                PointCodec::serialize(&self.points[point], writer)?;
                let size = i64::try_from(size)
                    .map_err(|_| OxiclusterError::invalid_argument("subtree size does not fit in an i64"))?;
                writer.write_i64::<LittleEndian>(size)?;
                writer.write_i32::<LittleEndian>(to_i32(depth, "depth")?)?;
                self.write_node(writer, Some(left))?;
                self.write_node(writer, Some(right))?;
            }
        }
        writer.write_u8(NODE_SENTINEL)?;
        Ok(())
    }

    /// Reads a tree written by [`KdTree::write_to`].
    ///
    /// Point slots of the loaded tree follow the pre-order of the stored nodes.
    ///
    /// # Errors
    ///
    /// `CorruptIndex` on a sentinel mismatch or inconsistent structure, `Io`
    /// if the input ends early.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, OxiclusterError> {
        let seed = match reader.read_u8()? {
            0 => None,
            1 => Some(reader.read_u64::<LittleEndian>()?),
            other => {
                return Err(OxiclusterError::CorruptIndex(format!("bad seed flag {}", other)));
            }
        };
        let dimension = to_usize(reader.read_i32::<LittleEndian>()?, "dimension")?;
        let metric = DistanceMetric::from_code(reader.read_i32::<LittleEndian>()?)?;

        let mut tree = Self::new(metric, seed);
        tree.dimension = dimension;
        tree.root = tree.read_node(reader, 0)?;
        expect_sentinel(reader, TREE_SENTINEL)?;

        for point in &tree.points {
            if point.dimension() != dimension {
                return Err(OxiclusterError::CorruptIndex(format!(
                    "point {} has dimension {} in a tree of dimension {}",
                    point.id(),
                    point.dimension(),
                    dimension
                )));
            }
        }
        if tree.any() && dimension == 0 {
            return Err(OxiclusterError::corrupt("non-empty tree with dimension 0"));
        }
        Ok(tree)
    }

    fn read_node<R: Read>(&mut self, reader: &mut R, level: usize) -> Result<Option<NodeId>, OxiclusterError> {
        if level > MAX_DEPTH + 1 {
            return Err(OxiclusterError::corrupt("node nesting exceeds the maximum depth"));
        }

        let node_type = reader.read_u8()?;
        let id = match node_type {
            NODE_ABSENT => None,
            NODE_INTERNAL | NODE_LEAF => {
                let has_point = reader.read_u8()? == 1;
                let point = if has_point { Some(PointCodec::deserialize(reader)?) } else { None };
                let size = to_usize(reader.read_i64::<LittleEndian>()?, "size")?;
                let depth = to_usize(reader.read_i32::<LittleEndian>()?, "depth")?;

                // Reserve the slot first so ids follow pre-order.
                self.nodes.push(KdNode::Leaf { depth });
                let id = self.nodes.len() - 1;
                let slot = point.map(|p| {
                    self.points.push(p);
                    self.points.len() - 1
                });

                let left = self.read_node(reader, level + 1)?;
                let right = self.read_node(reader, level + 1)?;

                self.nodes[id] = match (node_type, slot, left, right) {
                    (NODE_LEAF, None, None, None) if size == 0 => KdNode::Leaf { depth },
                    (NODE_INTERNAL, Some(point), Some(left), Some(right)) => {
                        let expected = 1 + self.nodes[left].size() + self.nodes[right].size();
                        if size != expected {
                            return Err(OxiclusterError::CorruptIndex(format!(
                                "node size {} does not match its subtrees ({})",
                                size, expected
                            )));
                        }
                        KdNode::Internal { point, left, right, size, depth }
                    }
                    _ => {
                        return Err(OxiclusterError::CorruptIndex(format!(
                            "malformed node of type {} at depth {}",
                            node_type, depth
                        )));
                    }
                };
                Some(id)
            }
            other => {
                return Err(OxiclusterError::CorruptIndex(format!("bad node type {}", other)));
            }
        };
        expect_sentinel(reader, NODE_SENTINEL)?;
        Ok(id)
    }

    /// Writes the tree to a file, replacing any existing content.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), OxiclusterError> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        debug!(path = %path.as_ref().display(), points = self.len(), "saved k-d tree");
        Ok(())
    }

    /// Loads a tree saved with [`KdTree::save_to_path`].
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, OxiclusterError> {
        let mut reader = BufReader::new(File::open(path.as_ref())?);
        let tree = Self::read_from(&mut reader)?;
        debug!(path = %path.as_ref().display(), points = tree.len(), "loaded k-d tree");
        Ok(tree)
    }
}
