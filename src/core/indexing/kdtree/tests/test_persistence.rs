// src/core/indexing/kdtree/tests/test_persistence.rs

use super::test_builder::builder_tests::{assert_invariants, random_points};
use crate::core::common::traits::{DataDeserializer, DataSerializer};
use crate::core::common::OxiclusterError;
use crate::core::indexing::kdtree::{KdTree, PointCodec};
use crate::core::types::Point;
use crate::core::vector::DistanceMetric;
use std::io::Cursor;
use tempfile::tempdir;

fn to_bytes(tree: &KdTree) -> Vec<u8> {
    let mut bytes = Vec::new();
    tree.write_to(&mut bytes).unwrap();
    bytes
}

fn ids_and_distances(found: &[crate::core::indexing::kdtree::Neighbour]) -> Vec<(i64, f32)> {
    let mut pairs: Vec<(i64, f32)> = found.iter().map(|n| (n.id, n.distance)).collect();
    pairs.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    pairs
}

#[test]
fn test_round_trip_preserves_queries() {
    let tree = KdTree::build(random_points(150, 3, 31), DistanceMetric::L1, Some(31)).unwrap();
    let loaded = KdTree::read_from(&mut Cursor::new(to_bytes(&tree))).unwrap();

    assert_eq!(loaded.len(), tree.len());
    assert_eq!(loaded.dimension(), 3);
    assert_eq!(loaded.metric(), DistanceMetric::L1);
    assert_eq!(loaded.seed(), Some(31));
    assert_invariants(&loaded);

    for query in random_points(12, 3, 310) {
        let before = tree.nearest_neighbours(&query, 7).unwrap();
        let after = loaded.nearest_neighbours(&query, 7).unwrap();
        assert_eq!(ids_and_distances(&before), ids_and_distances(&after));

        let before = tree.within_distance(&query, 6.0).unwrap();
        let after = loaded.within_distance(&query, 6.0).unwrap();
        assert_eq!(ids_and_distances(&before), ids_and_distances(&after));
    }
}

#[test]
fn test_round_trip_sparse_points() {
    let points = vec![
        Point::sparse(1, 6, vec![0, 5], vec![1.0, -2.0]).unwrap(),
        Point::sparse(2, 6, vec![], vec![]).unwrap(),
        Point::dense(3, vec![0.5, 0.0, 0.0, 1.0, 0.0, 0.0]),
    ];
    let tree = KdTree::build(points.clone(), DistanceMetric::Cosine, None).unwrap();
    let loaded = KdTree::read_from(&mut Cursor::new(to_bytes(&tree))).unwrap();

    assert_eq!(loaded.seed(), None);
    for point in &points {
        assert!(loaded.contains(point).unwrap());
    }
    let stored: Vec<&Point> = loaded.points().collect();
    let sparse = stored.iter().find(|p| p.id() == 1).unwrap();
    assert!(!sparse.coordinates().is_dense());
}

#[test]
fn test_round_trip_empty_tree() {
    let tree = KdTree::new(DistanceMetric::L2, Some(5));
    let loaded = KdTree::read_from(&mut Cursor::new(to_bytes(&tree))).unwrap();
    assert!(!loaded.any());
    assert_eq!(loaded.seed(), Some(5));
}

#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("index.kdt");

    let tree = KdTree::build(random_points(60, 2, 7), DistanceMetric::L2, Some(7)).unwrap();
    tree.save_to_path(&path).unwrap();
    let loaded = KdTree::load_from_path(&path).unwrap();

    let query = Point::dense(0, vec![0.0, 0.0]);
    assert_eq!(
        ids_and_distances(&tree.nearest_neighbours(&query, 5).unwrap()),
        ids_and_distances(&loaded.nearest_neighbours(&query, 5).unwrap())
    );
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempdir().unwrap();
    let err = KdTree::load_from_path(dir.path().join("absent.kdt")).unwrap_err();
    assert!(matches!(err, OxiclusterError::Io(_)));
}

#[test]
fn test_header_layout() {
    let tree = KdTree::build(vec![Point::dense(4, vec![1.0, 2.0])], DistanceMetric::Cosine, Some(3)).unwrap();
    let bytes = to_bytes(&tree);

    assert_eq!(bytes[0], 1);
    assert_eq!(&bytes[1..9], &3u64.to_le_bytes());
    assert_eq!(&bytes[9..13], &2i32.to_le_bytes());
    assert_eq!(&bytes[13..17], &2i32.to_le_bytes());
    // root: internal node holding a point
    assert_eq!(bytes[17], 1);
    assert_eq!(bytes[18], 1);
    assert_eq!(&bytes[19..27], &4i64.to_le_bytes());
    assert_eq!(bytes[bytes.len() - 1], 168);
    assert_eq!(bytes[bytes.len() - 2], 169);
}

#[test]
fn test_corrupt_trailer() {
    let tree = KdTree::build(random_points(5, 2, 1), DistanceMetric::L2, Some(1)).unwrap();
    let mut bytes = to_bytes(&tree);
    let last = bytes.len() - 1;
    bytes[last] = 0;
    let err = KdTree::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, OxiclusterError::CorruptIndex(_)));
}

#[test]
fn test_corrupt_point_sentinel() {
    let tree = KdTree::build(vec![Point::dense(4, vec![1.0, 2.0])], DistanceMetric::L2, Some(3)).unwrap();
    let mut bytes = to_bytes(&tree);
    // header (17) + node type and presence (2) + id, length, count (16)
    // + values (4 + 8) + indices (4)
    let offset = 17 + 2 + 16 + 12 + 4;
    assert_eq!(bytes[offset], 167);
    bytes[offset] = 1;
    let err = KdTree::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, OxiclusterError::CorruptIndex(_)));
}

#[test]
fn test_value_count_must_match_array_length() {
    let tree = KdTree::build(vec![Point::dense(4, vec![1.0, 2.0])], DistanceMetric::L2, Some(3)).unwrap();
    let mut bytes = to_bytes(&tree);
    // header (17) + node type and presence (2) + id, length (12)
    let offset = 17 + 2 + 12;
    assert_eq!(bytes[offset..offset + 4], 2i32.to_le_bytes());
    assert_eq!(bytes[offset + 4..offset + 8], 2i32.to_le_bytes());
    bytes[offset] = 3;
    let err = KdTree::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, OxiclusterError::CorruptIndex(_)));
}

#[test]
fn test_bad_node_type() {
    let tree = KdTree::build(random_points(3, 2, 1), DistanceMetric::L2, None).unwrap();
    let mut bytes = to_bytes(&tree);
    bytes[9] = 9;
    let err = KdTree::read_from(&mut Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, OxiclusterError::CorruptIndex(_)));
}

#[test]
fn test_truncated_input() {
    let tree = KdTree::build(random_points(8, 2, 1), DistanceMetric::L2, Some(1)).unwrap();
    let bytes = to_bytes(&tree);
    let err = KdTree::read_from(&mut Cursor::new(bytes[..bytes.len() / 2].to_vec())).unwrap_err();
    assert!(matches!(err, OxiclusterError::Io(_)));
}

#[test]
fn test_point_codec_dense_and_sparse() {
    for point in [
        Point::dense(-3, vec![1.5, 0.0, 2.5]),
        Point::sparse(8, 10, vec![2, 9], vec![3.0, 4.0]).unwrap(),
    ] {
        let mut bytes = Vec::new();
        PointCodec::serialize(&point, &mut bytes).unwrap();
        assert_eq!(*bytes.last().unwrap(), 167);

        let decoded = PointCodec::deserialize(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded.id(), point.id());
        assert_eq!(decoded, point);
        assert_eq!(decoded.coordinates().is_dense(), point.coordinates().is_dense());
    }
}
