//! Parentage and partner eligibility.

use serde::{Deserialize, Serialize};

use crate::config::SiblingRule;
use crate::ids::{Gender, MaritalStatus, VillagerId};

/// Father and mother of a villager. Absent for villagers created without
/// known parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parentage {
    pub father: VillagerId,
    pub mother: VillagerId,
}

impl Parentage {
    pub fn new(father: VillagerId, mother: VillagerId) -> Self {
        Self { father, mother }
    }

    pub fn is_parent(&self, id: VillagerId) -> bool {
        self.father == id || self.mother == id
    }
}

/// Whether two parentages make a forbidden sibling pair under `rule`.
///
/// Villagers with unknown parents are never siblings.
pub fn are_siblings(a: Option<&Parentage>, b: Option<&Parentage>, rule: SiblingRule) -> bool {
    let (Some(a), Some(b)) = (a, b) else {
        return false;
    };
    let same_father = a.father == b.father;
    let same_mother = a.mother == b.mother;
    match rule {
        SiblingRule::FullSiblings => same_father && same_mother,
        SiblingRule::AnySharedParent => same_father || same_mother,
    }
}

/// Snapshot of the Agent Record fields partner search looks at.
#[derive(Debug, Clone, Copy)]
pub struct CandidateView {
    pub id: VillagerId,
    pub gender: Gender,
    pub is_child: bool,
    pub status: MaritalStatus,
    pub parentage: Option<Parentage>,
    pub has_progression: bool,
    /// Still carrying a child, or gestating, from an earlier marriage.
    pub is_pregnant: bool,
}

/// Partner eligibility: opposite gender, single, adult, not pregnant, not a
/// sibling under `rule`, and able to take part in progression.
pub fn is_eligible_partner(seeker: &CandidateView, candidate: &CandidateView, rule: SiblingRule) -> bool {
    if seeker.id == candidate.id {
        return false;
    }
    if candidate.gender == seeker.gender {
        return false;
    }
    if candidate.status.is_taken() || candidate.is_child || !candidate.has_progression {
        return false;
    }
    if candidate.is_pregnant {
        return false;
    }
    !are_siblings(seeker.parentage.as_ref(), candidate.parentage.as_ref(), rule)
}
