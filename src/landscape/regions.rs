//! Land-use regions: a relaxed Voronoi partition typed by seeding around the
//! city centre, neighbour growth, gap fill and a final morph pass.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::RegionParams;
use crate::geometry::Point;
use crate::noise_field::NoiseField;
use crate::seeds::CitySeeds;
use crate::spatial::SpatialIndex;

use super::river::River;
use super::voronoi::{random_sites, relax, voronoi_cells};

/// Land use of a region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionType {
    /// Skyscrapers, offices
    Metropolitan,
    /// Shopping centres, banks, restaurants
    CommercialLarge,
    /// Factories, farms
    Industrial,
    /// Universities, hospitals
    Services,
    /// Local shops, cafes, schools
    CommercialSmall,
    /// Apartment blocks
    HousingDense,
    /// Middle class residences
    HousingLuxury,
    /// Parks, large open spaces
    Rural,
    /// Not yet typed
    None,
}

/// Axis thresholds of the commercialisation/density classification.
const LOW: f64 = 0.5;
const MED: f64 = 0.75;

impl RegionType {
    /// Every assignable type (excludes `None`).
    pub fn all() -> &'static [Self] {
        &[
            Self::Metropolitan,
            Self::CommercialLarge,
            Self::Industrial,
            Self::Services,
            Self::CommercialSmall,
            Self::HousingDense,
            Self::HousingLuxury,
            Self::Rural,
        ]
    }

    /// Type implied by a region's commercialisation and residential density, both in `[0, 1]`.
    pub fn classify(commercialisation: f64, density: f64) -> Self {
        if commercialisation < LOW {
            if density < LOW {
                Self::Rural
            } else if density < MED {
                Self::HousingLuxury
            } else {
                Self::HousingDense
            }
        } else if commercialisation < MED {
            if density < LOW {
                Self::CommercialSmall
            } else if density < MED {
                Self::CommercialLarge
            } else {
                Self::Services
            }
        } else if density < LOW {
            Self::Industrial
        } else if density < MED {
            Self::CommercialLarge
        } else {
            Self::Metropolitan
        }
    }

    /// Fill colour for map renderers.
    pub fn colour(&self) -> Option<[u8; 3]> {
        match self {
            Self::Metropolitan => Some([229, 112, 25]),
            Self::CommercialLarge => Some([255, 92, 80]),
            Self::Industrial => Some([255, 33, 81]),
            Self::Services => Some([139, 250, 255]),
            Self::CommercialSmall => Some([255, 160, 147]),
            Self::HousingDense => Some([134, 132, 255]),
            Self::HousingLuxury => Some([162, 176, 255]),
            Self::Rural => Some([56, 255, 46]),
            Self::None => None,
        }
    }

    /// Probability per growth pass of spreading onto an untyped neighbour.
    pub fn growth_chance(&self) -> f64 {
        match self {
            Self::Metropolitan => 0.5,
            Self::CommercialLarge => 0.4,
            Self::Industrial => 0.3,
            Self::Services => 0.3,
            Self::CommercialSmall => 0.4,
            Self::HousingDense => 0.6,
            Self::HousingLuxury => 0.5,
            Self::Rural => 0.7,
            Self::None => 0.0,
        }
    }
}

impl std::fmt::Display for RegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Metropolitan => "metropolitan",
            Self::CommercialLarge => "commercial (large)",
            Self::Industrial => "industrial",
            Self::Services => "services",
            Self::CommercialSmall => "commercial (small)",
            Self::HousingDense => "housing (dense)",
            Self::HousingLuxury => "housing (luxury)",
            Self::Rural => "rural",
            Self::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// One seeding rule: place `count` regions of `region_type` at random
/// fractions within `[min_fraction, max_fraction]` of the centrality ranking.
#[derive(Clone, Copy, Debug)]
pub struct SeedRule {
    pub count: usize,
    pub region_type: RegionType,
    pub min_fraction: f64,
    pub max_fraction: f64,
}

const fn seed(count: usize, region_type: RegionType, min_fraction: f64, max_fraction: f64) -> SeedRule {
    SeedRule {
        count,
        region_type,
        min_fraction,
        max_fraction,
    }
}

/// Applied in order; later entries overwrite earlier ones on collision.
pub const SEED_TABLE: [SeedRule; 8] = [
    seed(1, RegionType::Metropolitan, 0.0, 0.05),
    seed(3, RegionType::CommercialLarge, 0.0, 0.2),
    seed(4, RegionType::Services, 0.05, 0.4),
    seed(6, RegionType::CommercialSmall, 0.1, 0.7),
    seed(6, RegionType::HousingDense, 0.05, 0.5),
    seed(6, RegionType::HousingLuxury, 0.3, 0.9),
    seed(2, RegionType::Industrial, 0.4, 1.0),
    seed(10, RegionType::Rural, 0.0, 1.0),
];

/// `(from, to, probability)` re-rolls applied after growth.
pub const MORPH_RULES: [(RegionType, RegionType, f64); 3] = [
    (RegionType::HousingDense, RegionType::CommercialSmall, 0.1),
    (RegionType::Rural, RegionType::HousingLuxury, 0.05),
    (RegionType::CommercialLarge, RegionType::Services, 0.1),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Region {
    /// Voronoi site
    pub centre: Point,
    /// Boundary ring, sorted by angle around `centre`
    pub polygon: Vec<Point>,
    pub region_type: RegionType,
    /// Squared distance to the city centre, normalised to `[0, 1]`
    pub distance_from_centre: f64,
    pub commercialisation: f64,
    pub density: f64,
}

/// All regions of a landscape plus a nearest-neighbour index over their centres.
#[derive(Clone, Debug)]
pub struct RegionMap {
    regions: Vec<Region>,
    index: SpatialIndex,
    /// Region indices, closest to the city centre first
    ranking: Vec<usize>,
    /// Number of leading `ranking` entries eligible for seeding
    eligible: usize,
}

impl RegionMap {
    /// Partition the domain and type every region.
    ///
    /// The city centre is a random point from the middle of the river, or the
    /// domain centre if the river is empty.
    pub fn generate(width: f64, height: f64, params: &RegionParams, seeds: &CitySeeds, river: &River) -> Self {
        let mut rng = CitySeeds::rng(seeds.regions);

        let sites = random_sites(params.point_count, width, height, &mut rng);
        let sites = relax(sites, width, height, params.relax_count);
        let cells = voronoi_cells(&sites, width, height);

        let commercial = NoiseField::new(seeds.commercial, params.commercial_scale);
        let residential = NoiseField::new(seeds.residential, params.density_scale);

        let regions = cells
            .into_iter()
            .map(|cell| Region {
                centre: cell.site,
                commercialisation: commercial.value(cell.site.x, cell.site.y),
                density: residential.value(cell.site.x, cell.site.y),
                polygon: cell.polygon,
                region_type: RegionType::None,
                distance_from_centre: 0.0,
            })
            .collect();

        let centre = river
            .central_point(&mut rng)
            .unwrap_or_else(|| Point::new(width / 2.0, height / 2.0));

        let mut map = Self::from_regions(regions);
        map.rank(centre, width * width + height * height);
        map.seed(&mut rng);
        for end in [river.first(), river.last()].into_iter().flatten() {
            map.force_nearest(end, RegionType::Industrial);
        }
        let passes = map.grow(params.growth_neighbours, &mut rng);
        let filled = map.fill_gaps();
        map.morph(&mut rng);

        log::info!(
            "Regions typed: {} regions, {} growth passes, {} gap-filled",
            map.regions.len(),
            passes,
            filled
        );
        map
    }

    /// Wrap already-built regions; they are ranked in input order until [`RegionMap::rank`] runs.
    pub fn from_regions(regions: Vec<Region>) -> Self {
        let index = SpatialIndex::build(regions.iter().enumerate().map(|(i, r)| (r.centre, i)).collect());
        let ranking = (0..regions.len()).collect();
        let eligible = regions.len();
        Self {
            regions,
            index,
            ranking,
            eligible,
        }
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region whose centre is closest to `point`.
    pub fn region_at(&self, point: Point) -> Option<&Region> {
        self.index.nearest(point).map(|n| &self.regions[n.id])
    }

    pub fn count_of(&self, region_type: RegionType) -> usize {
        self.regions.iter().filter(|r| r.region_type == region_type).count()
    }

    /// Sort regions by squared distance to `centre`; those farther than
    /// `max_distance_sq` are not seeding targets.
    pub fn rank(&mut self, centre: Point, max_distance_sq: f64) {
        let distances: Vec<f64> = self.regions.iter().map(|r| r.centre.distance_sq(&centre)).collect();

        let mut ranking: Vec<usize> = (0..self.regions.len()).collect();
        ranking.sort_by(|&a, &b| distances[a].total_cmp(&distances[b]).then(a.cmp(&b)));

        self.eligible = ranking
            .iter()
            .take_while(|&&i| distances[i] <= max_distance_sq)
            .count();

        let furthest = ranking[..self.eligible]
            .last()
            .map_or(0.0, |&i| distances[i]);
        for (region, d) in self.regions.iter_mut().zip(&distances) {
            region.distance_from_centre = if furthest > 0.0 {
                (d / furthest).min(1.0)
            } else {
                0.0
            };
        }

        self.ranking = ranking;
    }

    /// Apply [`SEED_TABLE`] to the eligible prefix of the ranking.
    pub fn seed(&mut self, rng: &mut ChaCha8Rng) {
        if self.eligible == 0 {
            return;
        }

        for rule in SEED_TABLE {
            for _ in 0..rule.count {
                let fraction = rng.gen_range(rule.min_fraction..=rule.max_fraction);
                let position = ((fraction * self.eligible as f64) as usize).min(self.eligible - 1);
                let region = self.ranking[position];
                self.regions[region].region_type = rule.region_type;
            }
        }
    }

    /// Set the type of the region nearest to `point`.
    pub fn force_nearest(&mut self, point: Point, region_type: RegionType) {
        if let Some(nearest) = self.index.nearest(point) {
            self.regions[nearest.id].region_type = region_type;
        }
    }

    /// Spread types onto untyped neighbours until a pass changes nothing.
    /// Returns the number of passes run.
    pub fn grow(&mut self, neighbours: usize, rng: &mut ChaCha8Rng) -> usize {
        let mut passes = 0;

        loop {
            passes += 1;
            let mut changed = false;

            for position in 0..self.ranking.len() {
                let i = self.ranking[position];
                let region_type = self.regions[i].region_type;
                let chance = region_type.growth_chance();
                if chance <= 0.0 {
                    continue;
                }

                let target = self
                    .index
                    .k_nearest(self.regions[i].centre, neighbours + 1)
                    .into_iter()
                    .map(|n| n.id)
                    .find(|&id| id != i && self.regions[id].region_type == RegionType::None);

                if let Some(target) = target {
                    if rng.gen::<f64>() < chance {
                        self.regions[target].region_type = region_type;
                        changed = true;
                    }
                }
            }

            log::debug!("Region growth pass {}: changed = {}", passes, changed);
            if !changed {
                return passes;
            }
        }
    }

    /// Give every untyped region the type of the previous typed region in the
    /// ranking, or the next one for leading gaps. With nothing typed at all,
    /// regions fall back to their own classification. Returns how many were filled.
    pub fn fill_gaps(&mut self) -> usize {
        let mut filled = 0;

        let mut previous = RegionType::None;
        for &i in &self.ranking {
            let region = &mut self.regions[i];
            if region.region_type == RegionType::None {
                if previous != RegionType::None {
                    region.region_type = previous;
                    filled += 1;
                }
            } else {
                previous = region.region_type;
            }
        }

        let mut next = RegionType::None;
        for &i in self.ranking.iter().rev() {
            let region = &mut self.regions[i];
            if region.region_type == RegionType::None {
                region.region_type = if next != RegionType::None {
                    next
                } else {
                    RegionType::classify(region.commercialisation, region.density)
                };
                filled += 1;
            } else {
                next = region.region_type;
            }
        }

        filled
    }

    /// Apply [`MORPH_RULES`], at most one re-roll per region.
    pub fn morph(&mut self, rng: &mut ChaCha8Rng) {
        for &i in &self.ranking {
            let region = &mut self.regions[i];
            for (from, to, probability) in MORPH_RULES {
                if region.region_type == from {
                    if rng.gen::<f64>() < probability {
                        region.region_type = to;
                    }
                    break;
                }
            }
        }
    }
}
