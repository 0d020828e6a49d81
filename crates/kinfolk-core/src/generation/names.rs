//! Name generation utilities

use crate::components::{Gender, Name};
use rand::Rng;

/// Generate a random name for a villager of `gender`
pub fn generate_name(gender: Gender, rng: &mut impl Rng) -> Name {
    Name::new(given_name(gender, rng), family_name(rng))
}

pub fn given_name(gender: Gender, rng: &mut impl Rng) -> &'static str {
    let pool = match gender {
        Gender::Male => MALE_GIVEN_NAMES,
        Gender::Female => FEMALE_GIVEN_NAMES,
    };
    pool[rng.gen_range(0..pool.len())]
}

pub fn family_name(rng: &mut impl Rng) -> &'static str {
    FAMILY_NAMES[rng.gen_range(0..FAMILY_NAMES.len())]
}

// Sample name lists - would be loaded from data files in production
static MALE_GIVEN_NAMES: &[&str] = &[
    "Aldric", "Bram", "Cedric", "Dunstan", "Edwin", "Falk", "Garrick", "Hobb",
    "Ivo", "Jory", "Kendrick", "Leofric", "Merek", "Niall", "Osric", "Piers",
    "Quill", "Roderick", "Sewell", "Tobin", "Ulric", "Wat", "Wystan", "Yorick",
];

static FEMALE_GIVEN_NAMES: &[&str] = &[
    "Agnes", "Beatrix", "Cecily", "Dulcie", "Edith", "Fenna", "Gisela", "Hild",
    "Isolde", "Joan", "Kat", "Lettice", "Maud", "Nell", "Odette", "Petronel",
    "Rosamund", "Sabine", "Tamsin", "Ursel", "Wenna", "Yvette", "Elowen", "Mirabel",
];

static FAMILY_NAMES: &[&str] = &[
    // Trades
    "Miller", "Cooper", "Fletcher", "Thatcher", "Mason", "Tanner", "Weaver",
    "Smith", "Chandler", "Carter", "Fisher", "Baker", "Brewer", "Turner",
    // Places
    "Ashdown", "Brook", "Hollow", "Marsh", "Thornfield", "Underhill", "Westmoor",
    "Fenwick", "Oakley", "Redcliffe",
];
