//! Nairobi delivery regions and their flat charges (KSh).

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
  pub name:   &'static str,
  pub charge: u32,
  pub area:   &'static str,
}

const fn region(name: &'static str, charge: u32, area: &'static str) -> Region {
  Region { name, charge, area }
}

/// Areas in display order.
pub const AREAS: &[&str] = &[
  "Nairobi CBD",
  "Ngong Road",
  "Limuru Road",
  "Waiyaki Way",
  "Langata Road",
  "Mombasa Road",
  "Thika Road",
  "Jogoo Road",
  "Kiambu Road",
];

const PICKUP_AREA: &str = "Dynamic Mall 5th Floor Shop Ml212, Nairobi CBD";

pub const REGIONS: &[Region] = &[
  region("CBD Errands", 100, "Nairobi CBD"),
  region("Pickup Shelf", 0, PICKUP_AREA),
  region("Upperhill", 300, "Ngong Road"),
  region("Hurlingham", 300, "Limuru Road"),
  region("Ngara", 250, "Limuru Road"),
  region("Mbagathi", 300, "Limuru Road"),
  region("Parklands", 300, "Limuru Road"),
  region("Yaya Center", 300, "Limuru Road"),
  region("Kilimani", 300, "Limuru Road"),
  region("Kileleshwa", 300, "Limuru Road"),
  region("Muthaiga", 350, "Limuru Road"),
  region("Karura", 350, "Limuru Road"),
  region("Lavington", 350, "Limuru Road"),
  region("Riara/Adams", 350, "Limuru Road"),
  region("Racecourse", 400, "Limuru Road"),
  region("Gigiri/V. Market", 450, "Limuru Road"),
  region("Roseline", 450, "Limuru Road"),
  region("Ruaka", 500, "Limuru Road"),
  region("Banana", 600, "Limuru Road"),
  region("Ngong", 800, "Limuru Road"),
  region("Wayaki Way", 300, "Waiyaki Way"),
  region("Westland", 300, "Waiyaki Way"),
  region("Spring Valley", 300, "Waiyaki Way"),
  region("N. West/Madaraka", 300, "Waiyaki Way"),
  region("Loresho/Kangemi", 300, "Waiyaki Way"),
  region("Wilson/Carnivore", 300, "Waiyaki Way"),
  region("Langata Rd", 300, "Langata Road"),
  region("M.View", 350, "Langata Road"),
  region("Langata", 450, "Langata Road"),
  region("Bomas", 450, "Langata Road"),
  region("Uthiru/L. Kabete", 450, "Langata Road"),
  region("Karen", 500, "Langata Road"),
  region("Muthiga/Regen", 500, "Langata Road"),
  region("Kitsuru", 600, "Langata Road"),
  region("Kikuyu", 650, "Langata Road"),
  region("Kiserian", 650, "Langata Road"),
  region("Rongai", 700, "Langata Road"),
  region("Sigona", 900, "Langata Road"),
  region("South B/C", 300, "Mombasa Road"),
  region("Imara", 350, "Mombasa Road"),
  region("GM/Industrial Area", 350, "Mombasa Road"),
  region("Syokimau", 500, "Mombasa Road"),
  region("Cabanas", 600, "Mombasa Road"),
  region("JKIA", 650, "Mombasa Road"),
  region("Katani", 700, "Mombasa Road"),
  region("Mlolongo", 800, "Mombasa Road"),
  region("Athi River/Kitengela", 900, "Mombasa Road"),
  region("Pangani", 250, "Thika Road"),
  region("Eastleigh", 300, "Thika Road"),
  region("Airtel/Panari", 350, "Thika Road"),
  region("Allsoaps", 400, "Thika Road"),
  region("Mwiki/Kahawa", 500, "Thika Road"),
  region("Kasarani", 600, "Thika Road"),
  region("KU", 650, "Thika Road"),
  region("Ruiru", 800, "Thika Road"),
  region("Juja", 900, "Thika Road"),
  region("Thika", 1000, "Thika Road"),
  region("City Stadium", 300, "Jogoo Road"),
  region("Uchumi/Makadara", 300, "Jogoo Road"),
  region("Donholm/Pipeline", 400, "Jogoo Road"),
  region("Muthaiga (Kiambu Rd)", 350, "Kiambu Road"),
  region("Runda", 400, "Kiambu Road"),
  region("N. Bypass", 400, "Kiambu Road"),
  region("Ridgeways", 600, "Kiambu Road"),
  region("Thindigua", 800, "Kiambu Road"),
];

/// Look up a region by name, ignoring case and surrounding whitespace.
pub fn find(name: &str) -> Option<&'static Region> {
  let name = name.trim();
  REGIONS.iter().find(|r| r.name.eq_ignore_ascii_case(name))
}

pub fn fee_for(name: &str) -> Option<u32> { find(name).map(|r| r.charge) }

pub fn regions() -> &'static [Region] { REGIONS }

#[derive(Debug, Clone, Serialize)]
pub struct AreaGroup {
  pub name:    &'static str,
  pub regions: Vec<&'static Region>,
}

/// Regions grouped under [`AREAS`], in display order. Regions whose area is
/// not a listed road (the pickup shelf) come first as their own group.
pub fn areas() -> Vec<AreaGroup> {
  let mut groups: Vec<AreaGroup> = REGIONS
    .iter()
    .filter(|r| !AREAS.contains(&r.area))
    .map(|r| AreaGroup { name: r.area, regions: vec![r] })
    .collect();
  groups.extend(AREAS.iter().map(|area| AreaGroup {
    name:    *area,
    regions: REGIONS.iter().filter(|r| r.area == *area).collect(),
  }));
  groups.retain(|g| !g.regions.is_empty());
  groups
}
