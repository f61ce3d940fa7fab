/// Title-case `value`: the first letter of every run of letters is
/// uppercased and the rest of the run lowercased. Any non-letter character,
/// digits and apostrophes included, starts a new run, so `"2nd"` becomes
/// `"2Nd"` and `"o'neil"` becomes `"O'Neil"`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;

    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalizes_each_word() {
        assert_eq!(title_case("dune messiah"), "Dune Messiah");
        assert_eq!(title_case("THE HOBBIT"), "The Hobbit");
        assert_eq!(title_case("Dune Messiah"), "Dune Messiah");
    }

    #[test]
    fn test_punctuation_starts_a_new_word() {
        assert_eq!(title_case("war-and peace: vol.two"), "War-And Peace: Vol.Two");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("the 2nd edition"), "The 2Nd Edition");
    }

    #[test]
    fn test_whitespace_is_preserved() {
        assert_eq!(title_case("  the   road "), "  The   Road ");
        assert_eq!(title_case(""), "");
    }
}
