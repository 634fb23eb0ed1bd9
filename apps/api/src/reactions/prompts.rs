// Prompt constants for the Reactions module.

use crate::voters::models::VoterRecord;

/// Placeholder for attributes the record does not carry.
const MISSING: &str = "N/A";

/// Reaction prompt template.
/// Replace: {name}, {age}, {district}, {ideology}, {party}, {income},
///          {education}, {race}, {voted_2020}, {intention_2024}, {speech}
pub const REACTION_PROMPT_TEMPLATE: &str = r#"You are simulating a voter named {name}, age {age}, in district {district}.
They are a {ideology} {party}, income: {income}, education: {education}, race: {race}.
They voted in 2020: {voted_2020} and their 2024 intention is: {intention_2024}.

Given this speech:
"""{speech}"""

What is their likely emotional and political reaction in 2–3 sentences?"#;

fn or_missing(value: &str) -> &str {
    if value.is_empty() {
        MISSING
    } else {
        value
    }
}

/// Fills the reaction template. Deterministic for a given speech and voter.
pub fn build_reaction_prompt(speech: &str, voter: &VoterRecord) -> String {
    let age = voter
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| MISSING.to_string());

    // Speech goes last so template markers inside it are never substituted.
    REACTION_PROMPT_TEMPLATE
        .replace("{name}", or_missing(&voter.name))
        .replace("{age}", &age)
        .replace("{district}", or_missing(&voter.congressional_district))
        .replace("{ideology}", or_missing(&voter.ideology))
        .replace("{party}", or_missing(&voter.party_id))
        .replace("{income}", or_missing(&voter.income))
        .replace("{education}", or_missing(&voter.education_expanded))
        .replace("{race}", or_missing(&voter.race_expanded))
        .replace("{voted_2020}", or_missing(&voter.voted_2020))
        .replace("{intention_2024}", or_missing(&voter.vote_intention_2024))
        .replace("{speech}", speech)
}
