use crate::module::error::AppError;

const DOCUMENT_SEPARATORS: [char; 4] = ['.', '-', '/', ' '];
const PHONE_SEPARATORS: [char; 6] = ['(', ')', '-', ' ', '+', '.'];

pub fn require_text(
    code: &'static str,
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, AppError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(AppError::bad_request(
            code,
            format!("{field} must have between {min} and {max} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

pub fn optional_text(
    code: &'static str,
    field: &str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, AppError> {
    let Some(v) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    if v.chars().count() > max {
        return Err(AppError::bad_request(
            code,
            format!("{field} must have at most {max} characters"),
        ));
    }
    Ok(Some(v.to_string()))
}

pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_ascii_lowercase();
    let invalid = || AppError::bad_request("INVALID_EMAIL", "email is not valid");
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels = domain.split('.').collect::<Vec<_>>();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

/// Strips the usual CPF/CNPJ punctuation; any other non-digit is rejected.
pub fn document_digits(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len());
    for c in input.trim().chars() {
        if c.is_ascii_digit() {
            out.push(c);
        } else if !DOCUMENT_SEPARATORS.contains(&c) {
            return None;
        }
    }
    Some(out)
}

pub fn is_valid_cpf(digits: &str) -> bool {
    let Some(d) = to_digit_vec(digits, 11) else {
        return false;
    };
    if d.iter().all(|x| *x == d[0]) {
        return false;
    }
    let check = |len: usize| -> u32 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, x)| x * (len as u32 + 1 - i as u32))
            .sum();
        let r = (sum * 10) % 11;
        if r == 10 { 0 } else { r }
    };
    check(9) == d[9] && check(10) == d[10]
}

pub fn is_valid_cnpj(digits: &str) -> bool {
    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    let Some(d) = to_digit_vec(digits, 14) else {
        return false;
    };
    if d.iter().all(|x| *x == d[0]) {
        return false;
    }
    let check = |weights: &[u32]| -> u32 {
        let sum: u32 = d.iter().zip(weights).map(|(x, w)| x * w).sum();
        let r = sum % 11;
        if r < 2 { 0 } else { 11 - r }
    };
    check(&W1) == d[12] && check(&W2) == d[13]
}

/// Brazilian phone: DDD + 8 or 9 digits, optional +55 prefix.
pub fn normalize_phone(phone: &str) -> Result<String, AppError> {
    let invalid = || {
        AppError::bad_request(
            "INVALID_PHONE",
            "phone must have 10 or 11 digits including area code",
        )
    };
    let mut digits = String::with_capacity(phone.len());
    for c in phone.trim().chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if !PHONE_SEPARATORS.contains(&c) {
            return Err(invalid());
        }
    }
    if (digits.len() == 12 || digits.len() == 13) && digits.starts_with("55") {
        digits.drain(..2);
    }
    if digits.len() != 10 && digits.len() != 11 {
        return Err(invalid());
    }
    if digits.starts_with('0') {
        return Err(invalid());
    }
    Ok(digits)
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    let len = password.chars().count();
    if !(8..=128).contains(&len) {
        return Err(AppError::bad_request(
            "INVALID_PASSWORD",
            "password must have between 8 and 128 characters",
        ));
    }
    Ok(())
}

fn to_digit_vec(digits: &str, len: usize) -> Option<Vec<u32>> {
    if digits.len() != len {
        return None;
    }
    digits.chars().map(|c| c.to_digit(10)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_check_digits() {
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("52998224724"));
        assert!(!is_valid_cpf("11111111111"));
        assert!(!is_valid_cpf("5299822472"));
    }

    #[test]
    fn cnpj_check_digits() {
        assert!(is_valid_cnpj("11222333000181"));
        assert!(!is_valid_cnpj("11222333000182"));
        assert!(!is_valid_cnpj("00000000000000"));
    }

    #[test]
    fn document_punctuation_is_stripped() {
        assert_eq!(document_digits("529.982.247-25").as_deref(), Some("52998224725"));
        assert_eq!(
            document_digits("11.222.333/0001-81").as_deref(),
            Some("11222333000181")
        );
        assert_eq!(document_digits("529x982"), None);
    }

    #[test]
    fn phone_normalization() {
        assert_eq!(normalize_phone("(11) 91234-5678").unwrap(), "11912345678");
        assert_eq!(normalize_phone("+55 11 3123-4567").unwrap(), "1131234567");
        assert!(normalize_phone("1234").is_err());
        assert!(normalize_phone("11 9123a5678").is_err());
    }

    #[test]
    fn email_shape() {
        assert_eq!(
            normalize_email(" Maria@Example.COM ").unwrap(),
            "maria@example.com"
        );
        assert!(normalize_email("maria@localhost").is_err());
        assert!(normalize_email("maria@@example.com").is_err());
        assert!(normalize_email("@example.com").is_err());
    }

    #[test]
    fn text_bounds() {
        assert_eq!(require_text("X", "name", "  Rex ", 1, 10).unwrap(), "Rex");
        assert!(require_text("X", "name", "   ", 1, 10).is_err());
        assert_eq!(optional_text("X", "obs", Some("  "), 5).unwrap(), None);
        assert!(optional_text("X", "obs", Some("123456"), 5).is_err());
    }
}
