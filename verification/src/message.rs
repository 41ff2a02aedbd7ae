/// The exact text a wallet signs to vote `option` on a proposal.
///
/// Built server-side from the stored proposal, so a signature over any other
/// proposal or option never matches.
pub fn canonical_message(description: &str, option: &str) -> String {
    format!(
        "I vote {option} for \"{description}\"\n\nSigning this transaction is free and will not cost you any gas."
    )
}
