//! Interface name normalization.
//!
//! `show interface status` prints `Gi1/0/1` while the running config says
//! `interface GigabitEthernet1/0/1`. Both are reduced to the short form
//! before comparing.

/// Known long/short prefix pairs, longest long form first within a family.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("TwentyFiveGigE", "Twe"),
    ("TwoGigabitEthernet", "Tw"),
    ("FiveGigabitEthernet", "Fi"),
    ("TenGigabitEthernet", "Te"),
    ("FortyGigabitEthernet", "Fo"),
    ("HundredGigE", "Hu"),
    ("AppGigabitEthernet", "Ap"),
    ("GigabitEthernet", "Gi"),
    ("FastEthernet", "Fa"),
    ("Ethernet", "Et"),
    ("Port-channel", "Po"),
    ("Vlan", "Vl"),
    ("Loopback", "Lo"),
    ("Tunnel", "Tu"),
];

/// Split `Gi1/0/1` into (`Gi`, `1/0/1`) at the first digit.
fn split_prefix(name: &str) -> (&str, &str) {
    let idx = name
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(name.len());
    (&name[..idx], &name[idx..])
}

/// Look up the short prefix for a long, short or partially abbreviated one.
fn short_prefix(prefix: &str) -> Option<&'static str> {
    if prefix.is_empty() {
        return None;
    }

    if let Some((_, short)) = ABBREVIATIONS
        .iter()
        .find(|(_, short)| short.eq_ignore_ascii_case(prefix))
    {
        return Some(*short);
    }
    if let Some((_, short)) = ABBREVIATIONS
        .iter()
        .find(|(long, _)| long.eq_ignore_ascii_case(prefix))
    {
        return Some(*short);
    }

    // Abbreviations such as `Gig` or `Port-ch`, accepted only when unambiguous
    let lower = prefix.to_ascii_lowercase();
    let mut candidates = ABBREVIATIONS
        .iter()
        .filter(|(long, _)| long.to_ascii_lowercase().starts_with(&lower));
    match (candidates.next(), candidates.next()) {
        (Some((_, short)), None) if prefix.len() >= 2 => Some(*short),
        _ => None,
    }
}

/// Reduce an interface name to its short form.
///
/// `GigabitEthernet1/0/1` becomes `Gi1/0/1`, `Port-channel10` becomes
/// `Po10`. Unknown prefixes keep their first two characters followed by the
/// suffix with letters and hyphens removed.
pub fn short_interface_name(name: &str) -> String {
    let name = name.trim();
    let (prefix, suffix) = split_prefix(name);

    match short_prefix(prefix) {
        Some(short) => format!("{}{}", short, suffix),
        None => {
            let head: String = name.chars().take(2).collect();
            let tail: String = name
                .chars()
                .skip(2)
                .filter(|c| !c.is_ascii_alphabetic() && *c != '-')
                .collect();
            format!("{}{}", head, tail)
        }
    }
}

/// Whether two names refer to the same interface.
pub fn same_interface(a: &str, b: &str) -> bool {
    short_interface_name(a).eq_ignore_ascii_case(&short_interface_name(b))
}

/// VLAN number of an SVI name such as `Vlan10` or `Vl10`.
pub fn vlan_interface_id(name: &str) -> Option<u16> {
    let short = short_interface_name(name);
    short.strip_prefix("Vl")?.parse().ok()
}
