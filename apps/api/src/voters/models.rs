use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Columns every voter file must carry. `voter_id` and `age_group` are optional.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "name",
    "age",
    "congressional_district",
    "ideology",
    "party_id",
    "income",
    "education_expanded",
    "race_expanded",
    "voted_2020",
    "vote_intention_2024",
];

/// One synthetic survey respondent. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRecord {
    pub id: String,
    pub name: String,
    pub age: Option<u32>,
    /// Display-only bucket, e.g. "45-64". Not part of eligibility.
    pub age_group: Option<String>,
    pub congressional_district: String,
    pub ideology: String,
    pub party_id: String,
    pub income: String,
    pub education_expanded: String,
    pub race_expanded: String,
    pub voted_2020: String,
    pub vote_intention_2024: String,
}

impl VoterRecord {
    /// A record is eligible for sampling only when every required attribute is populated.
    pub fn is_complete(&self) -> bool {
        self.age.is_some()
            && VoterField::ALL
                .iter()
                .all(|field| !field.value(self).is_empty())
            && !self.name.is_empty()
            && !self.id.is_empty()
    }
}

/// Categorical fields a filter may constrain.
/// Serialized names match the CSV column headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoterField {
    CongressionalDistrict,
    Ideology,
    PartyId,
    Income,
    EducationExpanded,
    RaceExpanded,
    #[serde(rename = "voted_2020")]
    Voted2020,
    #[serde(rename = "vote_intention_2024")]
    VoteIntention2024,
}

impl VoterField {
    pub const ALL: [VoterField; 8] = [
        VoterField::CongressionalDistrict,
        VoterField::Ideology,
        VoterField::PartyId,
        VoterField::Income,
        VoterField::EducationExpanded,
        VoterField::RaceExpanded,
        VoterField::Voted2020,
        VoterField::VoteIntention2024,
    ];

    pub fn value<'a>(&self, record: &'a VoterRecord) -> &'a str {
        match self {
            VoterField::CongressionalDistrict => &record.congressional_district,
            VoterField::Ideology => &record.ideology,
            VoterField::PartyId => &record.party_id,
            VoterField::Income => &record.income,
            VoterField::EducationExpanded => &record.education_expanded,
            VoterField::RaceExpanded => &record.race_expanded,
            VoterField::Voted2020 => &record.voted_2020,
            VoterField::VoteIntention2024 => &record.vote_intention_2024,
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == name)
    }

    pub fn column(&self) -> &'static str {
        match self {
            VoterField::CongressionalDistrict => "congressional_district",
            VoterField::Ideology => "ideology",
            VoterField::PartyId => "party_id",
            VoterField::Income => "income",
            VoterField::EducationExpanded => "education_expanded",
            VoterField::RaceExpanded => "race_expanded",
            VoterField::Voted2020 => "voted_2020",
            VoterField::VoteIntention2024 => "vote_intention_2024",
        }
    }
}

/// Equality constraints over categorical fields.
///
/// AND across fields, OR within a field's allowed set. An empty filter matches
/// every record; a field constrained to an empty set matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterFilter {
    constraints: BTreeMap<VoterField, BTreeSet<String>>,
}

impl VoterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `values` to the allowed set for `field`.
    pub fn allow<I, S>(mut self, field: VoterField, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints
            .entry(field)
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn matches(&self, record: &VoterRecord) -> bool {
        self.constraints
            .iter()
            .all(|(field, allowed)| allowed.contains(field.value(record)))
    }
}
