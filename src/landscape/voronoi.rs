//! Bounded Voronoi cells from a Delaunay triangulation, with Lloyd relaxation.
//!
//! A frame of ghost sites far outside the domain closes every real cell, so
//! each real site's cell is the ring of circumcenters of the triangles around
//! it. Cells are clipped to the domain rectangle.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use spade::{DelaunayTriangulation, Point2, Triangulation as _};

use crate::geometry::{circumcenter, clip_to_rect, dedup_ring, polygon_centroid, sort_by_angle, Point};

/// A site and its clipped cell, angle-sorted around the site.
#[derive(Clone, Debug, PartialEq)]
pub struct VoronoiCell {
    pub site: Point,
    pub polygon: Vec<Point>,
}

/// `count` uniformly random sites in `[0, width) x [0, height)`.
pub fn random_sites(count: usize, width: f64, height: f64, rng: &mut ChaCha8Rng) -> Vec<Point> {
    (0..count)
        .map(|_| Point::new(rng.gen::<f64>() * width, rng.gen::<f64>() * height))
        .collect()
}

fn ghost_frame(width: f64, height: f64) -> Vec<Point> {
    let margin = 2.0 * (width + height);
    let (x0, x1, xm) = (-margin, width + margin, width / 2.0);
    let (y0, y1, ym) = (-margin, height + margin, height / 2.0);
    vec![
        Point::new(x0, y0),
        Point::new(xm, y0),
        Point::new(x1, y0),
        Point::new(x1, ym),
        Point::new(x1, y1),
        Point::new(xm, y1),
        Point::new(x0, y1),
        Point::new(x0, ym),
    ]
}

/// Cells for every site that could be triangulated, in input order.
pub fn voronoi_cells(sites: &[Point], width: f64, height: f64) -> Vec<VoronoiCell> {
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();

    for ghost in ghost_frame(width, height) {
        if let Err(e) = triangulation.insert(Point2::new(ghost.x, ghost.y)) {
            log::warn!("Frame site {} rejected, edge cells may stay open: {:?}", ghost, e);
        }
    }

    let mut handles = Vec::with_capacity(sites.len());
    for site in sites {
        match triangulation.insert(Point2::new(site.x, site.y)) {
            Ok(handle) => handles.push((*site, handle)),
            Err(e) => log::debug!("Skipping Voronoi site {}: {:?}", site, e),
        }
    }

    handles
        .into_iter()
        .filter_map(|(site, handle)| {
            let vertex = triangulation.vertex(handle);
            let ring: Vec<Point> = vertex
                .out_edges()
                .filter_map(|edge| edge.face().as_inner())
                .map(|face| {
                    let [a, b, c] = face.vertices().map(|v| {
                        let p = v.position();
                        Point::new(p.x, p.y)
                    });
                    circumcenter(a, b, c)
                })
                .collect();

            let mut polygon = clip_to_rect(&ring, width, height);
            sort_by_angle(&mut polygon, site);
            dedup_ring(&mut polygon);

            if polygon.len() < 3 {
                return None;
            }
            Some(VoronoiCell { site, polygon })
        })
        .collect()
}

/// Move each site to the centroid of its clipped cell, `iterations` times.
pub fn relax(mut sites: Vec<Point>, width: f64, height: f64, iterations: usize) -> Vec<Point> {
    for _ in 0..iterations {
        sites = voronoi_cells(&sites, width, height)
            .into_iter()
            .map(|cell| polygon_centroid(&cell.polygon).unwrap_or(cell.site))
            .collect();
    }
    sites
}
