//! Polyline encode and decode commands.

use ambulink::model::LatLng;
use ambulink::polyline;

use super::common::parse_point;
use crate::error::CliError;

/// Print each decoded point as `lat,lng`.
pub fn run_decode(encoded: &str) -> Result<(), CliError> {
    let points = polyline::decode(encoded)?;
    for point in &points {
        println!("{:.5},{:.5}", point.latitude, point.longitude);
    }
    eprintln!("{} points", points.len());
    Ok(())
}

pub fn run_encode(points: &[String]) -> Result<(), CliError> {
    let points = points
        .iter()
        .map(|p| parse_point(p))
        .collect::<Result<Vec<LatLng>, _>>()?;
    println!("{}", polyline::encode(&points));
    Ok(())
}
