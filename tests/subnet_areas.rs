use std::fs;
use std::path::Path;

use geo::{Area, BooleanOps, Point};
use serde_json::json;

use subnet_areas::engine::dissolve::dissolve;
use subnet_areas::engine::voronoi::voronoi_polygons;
use subnet_areas::io::{read_lines, read_points};
use subnet_areas::{
    Attributes, CancellationToken, Destination, FieldValue, Inputs, Layer, OutputName, Pipeline,
    PipelineParams,
};

/// 4x4 block street grid, 100 units per block, noded at every intersection
fn write_roads(path: &Path) {
    let mut features = Vec::new();
    for i in 0..=4 {
        let c = i as f64 * 100.0;
        // Streets as one multi-part feature, avenues one feature per block
        let blocks: Vec<_> = (0..4)
            .map(|j| json!([[(j as f64 * 100.0), c], [((j + 1) as f64 * 100.0), c]]))
            .collect();
        features.push(json!({
            "type": "Feature",
            "geometry": { "type": "MultiLineString", "coordinates": blocks },
            "properties": { "name": format!("street {}", i) }
        }));
        for j in 0..4 {
            let (a, b) = (j as f64 * 100.0, (j + 1) as f64 * 100.0);
            features.push(json!({
                "type": "Feature",
                "geometry": { "type": "LineString", "coordinates": [[c, a], [c, b]] },
                "properties": { "name": format!("avenue {}", i) }
            }));
        }
    }
    let doc = json!({
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::3857" } },
        "features": features
    });
    fs::write(path, doc.to_string()).unwrap();
}

fn write_points(path: &Path) {
    let doc = json!({
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "id": 1, "geometry": { "type": "Point", "coordinates": [40.0, 110.0] }, "properties": {} },
            { "type": "Feature", "id": 2, "geometry": { "type": "Point", "coordinates": [300.0, 330.0] }, "properties": {} },
            { "type": "Feature", "id": 3, "geometry": { "type": "Point", "coordinates": [310.0, 50.0] }, "properties": {} },
            // Too far from any road to be a center
            { "type": "Feature", "id": 4, "geometry": { "type": "Point", "coordinates": [5000.0, 5000.0] }, "properties": {} }
        ]
    });
    fs::write(path, doc.to_string()).unwrap();
}

fn inputs(dir: &Path) -> Inputs {
    let roads = dir.join("roads.geojson");
    let points = dir.join("points.geojson");
    write_roads(&roads);
    write_points(&points);

    Inputs {
        points: read_points(&points).unwrap(),
        roads: read_lines(&roads).unwrap(),
        network_allocation: Destination::File(dir.join("network_allocation.geojson")),
        subnet_areas: Destination::File(dir.join("subnet_areas.geojson.gz")),
    }
}

#[test]
fn test_grid_run_writes_zones_per_connected_point() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = inputs(dir.path());

    let outputs = Pipeline::new(PipelineParams::default())
        .run(&inputs, &mut CancellationToken::new())
        .unwrap();
    assert_eq!(outputs.len(), 2);

    let allocation = read_lines(&dir.path().join("network_allocation.geojson")).unwrap();
    assert_eq!(allocation.len(), outputs.network_allocation().unwrap().len());
    assert!(allocation.crs.is_some());

    let mut cats: Vec<i64> = outputs
        .subnet_areas()
        .unwrap()
        .iter()
        .filter_map(|f| f.attributes.get("cat").and_then(FieldValue::as_i64))
        .collect();
    cats.sort();
    assert_eq!(cats, vec![1, 2, 3]);

    let written: serde_json::Value = {
        let file = fs::File::open(dir.path().join("subnet_areas.geojson.gz")).unwrap();
        serde_json::from_reader(flate2::read::GzDecoder::new(file)).unwrap()
    };
    assert_eq!(written["features"].as_array().unwrap().len(), 3);
    assert_eq!(written["crs"]["properties"]["name"], "urn:ogc:def:crs:EPSG::3857");

    let digests = &outputs.report.digests;
    assert!(digests.contains_key(OutputName::NetworkAllocation.as_str()));
    assert!(digests.contains_key(OutputName::SubnetAreas.as_str()));
}

#[test]
fn test_dissolve_keeps_tessellated_area() {
    let mut seeds = Layer::new("seeds");
    let coords = [
        (0.0, 0.0, 1),
        (40.0, 10.0, 1),
        (100.0, 0.0, 2),
        (90.0, 60.0, 2),
        (10.0, 80.0, 1),
        (55.0, 45.0, 3),
    ];
    for (x, y, cat) in coords {
        seeds.push(Point::new(x, y), Attributes::new().with("cat", cat));
    }

    let cells = voronoi_polygons(seeds, 0.0);
    let cell_area: f64 = cells.iter().map(|f| f.geometry.unsigned_area()).sum();
    let zones = dissolve(cells, &["cat"]);
    let zone_area: f64 = zones.iter().map(|f| f.geometry.unsigned_area()).sum();

    // The union runs on a snapped integer grid, so compare relative to the extent
    let extent = 100.0 * 80.0;
    assert!((cell_area - extent).abs() <= 1e-9 * extent);
    assert!((cell_area - zone_area).abs() <= 1e-9 * extent);
    for (i, a) in zones.iter().enumerate() {
        for b in zones.iter().skip(i + 1) {
            assert!(a.geometry.intersection(&b.geometry).unsigned_area() < 1e-6);
        }
    }
}
