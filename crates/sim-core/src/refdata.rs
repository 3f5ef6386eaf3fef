//! Reference data seeded before the simulation runs: titles, business
//! units, locations and clients. The simulators consume these by id only.

use crate::config::SimConfig;
use crate::domain::{
    BusinessUnit, Client, ClientId, Location, LocationId, TitleId, TitleRecord, UnitId,
};
use crate::error::SimError;
use crate::rng::SimRng;

/// The four regions, in unit-id order.
const BUSINESS_UNITS: [&str; 4] = [
    "North America",
    "Central and South America",
    "EMEA",
    "Asia Pacific",
];

const TITLES: [&str; 6] = [
    "Junior Consultant",
    "Consultant",
    "Senior Consultant",
    "Lead Consultant",
    "Project Manager",
    "Vice President",
];

/// (state/country, city, owning unit id).
const LOCATIONS: [(&str, &str, u32); 40] = [
    ("California", "Los Angeles", 1),
    ("New York", "New York City", 1),
    ("Illinois", "Chicago", 1),
    ("Texas", "Houston", 1),
    ("Pennsylvania", "Philadelphia", 1),
    ("Arizona", "Phoenix", 1),
    ("Texas", "San Antonio", 1),
    ("California", "San Diego", 1),
    ("Texas", "Dallas", 1),
    ("California", "San Jose", 1),
    ("Brazil", "Sao Paulo", 2),
    ("Mexico", "Mexico City", 2),
    ("Argentina", "Buenos Aires", 2),
    ("Colombia", "Bogota", 2),
    ("Peru", "Lima", 2),
    ("Venezuela", "Caracas", 2),
    ("Chile", "Santiago", 2),
    ("Ecuador", "Quito", 2),
    ("Guatemala", "Guatemala City", 2),
    ("Cuba", "Havana", 2),
    ("England", "London", 3),
    ("France", "Paris", 3),
    ("Germany", "Berlin", 3),
    ("Spain", "Madrid", 3),
    ("Italy", "Rome", 3),
    ("Netherlands", "Amsterdam", 3),
    ("Russia", "Moscow", 3),
    ("Sweden", "Stockholm", 3),
    ("Poland", "Warsaw", 3),
    ("Austria", "Vienna", 3),
    ("China", "Shanghai", 4),
    ("Japan", "Tokyo", 4),
    ("India", "Mumbai", 4),
    ("South Korea", "Seoul", 4),
    ("Australia", "Sydney", 4),
    ("Indonesia", "Jakarta", 4),
    ("Philippines", "Manila", 4),
    ("Thailand", "Bangkok", 4),
    ("Malaysia", "Kuala Lumpur", 4),
    ("Vietnam", "Ho Chi Minh City", 4),
];

/// Client volume per region.
const CLIENT_REGION_SHARES: [(u32, f64); 4] = [(1, 0.6), (3, 0.2), (2, 0.1), (4, 0.1)];

const COMPANY_WORDS: [&str; 24] = [
    "Apex", "Beacon", "Cascade", "Crestline", "Everline", "Fairmont", "Granite", "Harbor",
    "Ironwood", "Juniper", "Keystone", "Lakeside", "Meridian", "Northgate", "Oakfield",
    "Pinnacle", "Quarry", "Redwood", "Sterling", "Summit", "Trident", "Vantage", "Westbrook",
    "Zenith",
];

const COMPANY_SUFFIXES: [&str; 8] = [
    "Group", "Holdings", "Partners", "Industries", "Systems", "Ventures", "LLC", "Inc",
];

/// The seeded reference tables the simulation reads by id.
#[derive(Clone, Debug)]
pub struct RefData {
    pub titles: Vec<TitleRecord>,
    pub business_units: Vec<BusinessUnit>,
    pub locations: Vec<Location>,
    pub clients: Vec<Client>,
}

impl RefData {
    /// Build all four tables; the client pool is stochastic, the rest fixed.
    pub fn generate(cfg: &SimConfig, rng: &mut SimRng) -> Result<RefData, SimError> {
        let titles = titles();
        let business_units = business_units();
        let locations = locations();
        let clients = generate_clients(cfg.client_count, &locations, rng)?;
        Ok(RefData {
            titles,
            business_units,
            locations,
            clients,
        })
    }

    /// Pick a random client id; the pool must be non-empty.
    pub fn pick_client(&self, rng: &mut SimRng) -> Result<ClientId, SimError> {
        if self.clients.is_empty() {
            return Err(SimError::EmptyPool("Client"));
        }
        Ok(rng.choose(&self.clients).id)
    }
}

pub fn titles() -> Vec<TitleRecord> {
    TITLES
        .iter()
        .enumerate()
        .map(|(i, name)| TitleRecord {
            id: TitleId(i as u8 + 1),
            name: (*name).to_string(),
        })
        .collect()
}

pub fn business_units() -> Vec<BusinessUnit> {
    BUSINESS_UNITS
        .iter()
        .enumerate()
        .map(|(i, name)| BusinessUnit {
            id: UnitId(i as u32 + 1),
            name: (*name).to_string(),
        })
        .collect()
}

pub fn locations() -> Vec<Location> {
    LOCATIONS
        .iter()
        .enumerate()
        .map(|(i, (state, city, _))| Location {
            id: LocationId(i as u32 + 1),
            state: (*state).to_string(),
            city: (*city).to_string(),
        })
        .collect()
}

/// Generate the synthetic client pool, distributed across regions.
pub fn generate_clients(
    count: u32,
    locations: &[Location],
    rng: &mut SimRng,
) -> Result<Vec<Client>, SimError> {
    if locations.is_empty() {
        return Err(SimError::EmptyPool("Location"));
    }
    let mut clients = Vec::new();
    let mut next_id = 1u32;
    for (unit, share) in CLIENT_REGION_SHARES {
        let region_locations: Vec<&Location> = locations
            .iter()
            .filter(|l| {
                LOCATIONS
                    .get((l.id.0 - 1) as usize)
                    .map(|(_, _, u)| *u == unit)
                    .unwrap_or(false)
            })
            .collect();
        if region_locations.is_empty() {
            continue;
        }
        let region_count = ((count as f64) * share).round() as u32;
        for _ in 0..region_count {
            let word = *rng.choose(&COMPANY_WORDS);
            let suffix = *rng.choose(&COMPANY_SUFFIXES);
            let name = format!("{word} {suffix}");
            let slug = word.to_ascii_lowercase();
            let location = *rng.choose(&region_locations);
            clients.push(Client {
                id: ClientId(next_id),
                name,
                location: location.id,
                phone: random_phone(rng),
                email: format!("contact@{slug}{next_id}.com"),
            });
            next_id += 1;
        }
    }
    if clients.is_empty() {
        return Err(SimError::EmptyPool("Client"));
    }
    Ok(clients)
}

fn random_phone(rng: &mut SimRng) -> String {
    format!(
        "+1-{:03}-{:03}-{:04}",
        rng.int_in_range(200, 999),
        rng.int_in_range(200, 999),
        rng.int_in_range(0, 9999)
    )
}
