/// Shown for participants who cannot receive a reward (out of range or opted out).
pub const ZERO_REWARD: &str = "$0";

/// Dollar string with thousands separators: whole dollars from 1 upwards,
/// cents below that.
pub fn format_reward(amount: f64) -> String {
    if !amount.is_finite() || amount <= 0.0 {
        return "$0.00".to_string();
    }

    if amount >= 1.0 {
        format!("${}", group_thousands(&format!("{:.0}", amount)))
    } else {
        format!("${:.2}", amount)
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_dollars_above_one() {
        assert_eq!(format_reward(2894.736842), "$2,895");
        assert_eq!(format_reward(1315.79), "$1,316");
        assert_eq!(format_reward(1.0), "$1");
        assert_eq!(format_reward(999.4), "$999");
        assert_eq!(format_reward(1_234_567.0), "$1,234,567");
    }

    #[test]
    fn test_cents_below_one() {
        assert_eq!(format_reward(0.456), "$0.46");
        assert_eq!(format_reward(0.01), "$0.01");
        assert_eq!(format_reward(0.0), "$0.00");
    }
}
