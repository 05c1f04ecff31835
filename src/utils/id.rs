/// Generates a unique identifier.
///
/// This function creates a 30-character long unique identifier composed of
/// uppercase English letters (`A-Z`) and numbers (`0-9`) using the `nanoid`
/// library. The generated identifier is securely random and designed to be
/// collision-resistant; preview records and result metadata are keyed by it.
///
/// # Examples
/// ```
/// use capital_guard::utils::id::get_id;
/// let unique_id = get_id();
/// assert_eq!(unique_id.len(), 30);
/// ```
#[must_use]
pub fn get_id() -> String {
    let alphabet: Vec<char> = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".chars().collect();
    nanoid::nanoid!(30, &alphabet)
}

/// Generates a preview identifier (`PV_` followed by [`get_id`])
#[must_use]
pub fn preview_id() -> String {
    format!("PV_{}", get_id())
}
