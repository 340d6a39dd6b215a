// =============================================================================
// EloDex Backend - Input Validators
// =============================================================================
// Registration and password-reset input is rejected here before anything
// touches the database.
// =============================================================================

use chrono::{NaiveDate, Utc};

const PASSWORD_SPECIALS: &str = "!@#$%^&*()_-+=[]{};:'\",.<>/?\\|`~";

/// Basic shape check: one '@', non-empty local part, dot in the domain.
pub fn is_valid_email(email: &str) -> bool {
    let v = email.trim().to_lowercase();
    if v.chars().any(char::is_whitespace) {
        return false;
    }

    let mut parts = v.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    // domain needs at least "x.y"
    let mut labels = domain.split('.');
    labels.clone().count() >= 2 && labels.all(|l| !l.is_empty())
}

/// Minimum 6 chars, 1 uppercase, 1 lowercase, 1 digit, 1 special.
pub fn is_strong_password(password: &str) -> bool {
    if password.chars().count() < 6 {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return false;
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    if !password.chars().any(|c| PASSWORD_SPECIALS.contains(c)) {
        return false;
    }
    true
}

/// Strip everything but ASCII digits.
pub fn normalize_digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// CPF checksum (Brazilian national id): 11 digits, two verification digits.
pub fn is_valid_cpf(cpf_raw: &str) -> bool {
    let cpf = normalize_digits(cpf_raw);
    if cpf.len() != 11 {
        return false;
    }

    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 {
        return false;
    }

    // all-equal sequences pass the checksum but are not valid documents
    if digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    let sum: u32 = digits[..9]
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (10 - i as u32))
        .sum();
    let mut d1 = (sum * 10) % 11;
    if d1 == 10 {
        d1 = 0;
    }
    if d1 != digits[9] {
        return false;
    }

    let sum: u32 = digits[..10]
        .iter()
        .enumerate()
        .map(|(i, &d)| d * (11 - i as u32))
        .sum();
    let mut d2 = (sum * 10) % 11;
    if d2 == 10 {
        d2 = 0;
    }

    d2 == digits[10]
}

/// Date of birth in `DD/MM/YYYY`, between 1900 and 2100, not in the future.
pub fn is_valid_dob(dob: &str) -> bool {
    let parts: Vec<&str> = dob.split('/').collect();
    if parts.len() != 3 || parts[0].len() != 2 || parts[1].len() != 2 || parts[2].len() != 4 {
        return false;
    }

    let (Ok(dd), Ok(mm), Ok(yyyy)) = (
        parts[0].parse::<u32>(),
        parts[1].parse::<u32>(),
        parts[2].parse::<i32>(),
    ) else {
        return false;
    };

    if !(1900..=2100).contains(&yyyy) {
        return false;
    }

    let Some(date) = NaiveDate::from_ymd_opt(yyyy, mm, dd) else {
        return false;
    };

    date <= Utc::now().date_naive()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ash@pallet.town"));
        assert!(is_valid_email("  Ash@Pallet.Town  "));
        assert!(!is_valid_email("ash"));
        assert!(!is_valid_email("ash@pallet"));
        assert!(!is_valid_email("@pallet.town"));
        assert!(!is_valid_email("ash@pallet..town"));
        assert!(!is_valid_email("a sh@pallet.town"));
    }

    #[test]
    fn password_strength() {
        assert!(is_strong_password("Aa@123"));
        assert!(!is_strong_password("aaaaaa"));
        assert!(!is_strong_password("AAAAAA1!"));
        assert!(!is_strong_password("Aa11111"));
        assert!(!is_strong_password("Aa@12"));
    }

    #[test]
    fn cpf_checksum() {
        assert!(is_valid_cpf("52998224725"));
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(!is_valid_cpf("52998224724"));
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cpf("1234567890"));
    }

    #[test]
    fn dob_format_and_range() {
        assert!(is_valid_dob("31/12/1990"));
        assert!(!is_valid_dob("1990-12-31"));
        assert!(!is_valid_dob("31/02/1990"));
        assert!(!is_valid_dob("31/12/1899"));
        assert!(!is_valid_dob("01/01/2099"));
    }

    #[test]
    fn digit_normalization() {
        assert_eq!(normalize_digits("529.982.247-25"), "52998224725");
        assert_eq!(normalize_digits("abc"), "");
    }
}
