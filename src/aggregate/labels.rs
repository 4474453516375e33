//! Display labels for coded incident values.

/// Label for any code missing from a lookup.
pub const UNKNOWN: &str = "Unknown";

pub const SIGNS_OF_MENTAL_ILLNESS: &str = "Signs of Mental Illness";
pub const NO_SIGNS: &str = "No Signs";
pub const BODY_CAMERA: &str = "Body Camera Present";
pub const NO_BODY_CAMERA: &str = "No Body Camera";

const RACE_LABELS: [(&str, &str); 6] = [
    ("W", "White"),
    ("B", "Black"),
    ("H", "Hispanic"),
    ("A", "Asian"),
    ("N", "Native American"),
    ("O", "Other"),
];

const GENDER_LABELS: [(&str, &str); 2] = [("M", "Male"), ("F", "Female")];

fn lookup(table: &[(&str, &str)], code: &str) -> String {
    table
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn race_label(code: &str) -> String {
    lookup(&RACE_LABELS, code)
}

pub fn gender_label(code: &str) -> String {
    lookup(&GENDER_LABELS, code)
}

pub fn mental_illness_label(flag: bool) -> String {
    let label = if flag { SIGNS_OF_MENTAL_ILLNESS } else { NO_SIGNS };
    label.to_string()
}

pub fn body_camera_label(flag: bool) -> String {
    let label = if flag { BODY_CAMERA } else { NO_BODY_CAMERA };
    label.to_string()
}

/// Capitalise the first letter of every word and lowercase the rest, where a
/// word starts after any non-alphabetic character.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn verbatim(text: &str) -> String {
    text.to_string()
}
