// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use serde_json::{json, Value};
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Names a person might plausibly type.
pub fn legitimate_names() -> Vec<&'static str> {
    vec![
        "Anna", "Jo", "Mary-Jane", "O'Brien", "Иван", "Фёдор", "Sergey K.",
        "Li Wei", "Ekaterina Smirnova", "José",
    ]
}

/// Messages a person might plausibly write.
pub fn legitimate_messages() -> Vec<&'static str> {
    vec![
        "Hi! Could you send me a quote for a landing page?",
        "Здравствуйте, хотим заказать сайт.",
        "Ok",
        "Are you available for a call on Friday?",
        "Please call me back:\n+7 900 000 00 00",
    ]
}

/// Placeholder, keyboard-mash and token-spam names.
pub fn junk_names() -> Vec<&'static str> {
    vec![
        "", " ", "a", "test", "Test User", "qwerty", "asdf", "йцукен",
        "anonymous", "No Name", "bot", "null", "undefined", "zzzz", "0000",
        "98765", "!!!", "Имя",
    ]
}

/// Junk messages.
pub fn junk_messages() -> Vec<String> {
    vec![
        String::new(),
        "?".to_string(),
        "test".to_string(),
        "message".to_string(),
        "Тестовое сообщение".to_string(),
        "qweqweqwe".to_string(),
        "hhhhhhhhhhhhhhhhhhhhhhhhhhhhhh".to_string(),
        "https://spam.example/buy-cheap-pills-now-limited-offer".to_string(),
        "x".repeat(10) + &"y".repeat(40),
    ]
}

/// A submission body with the given name and message.
pub fn submission(name: &str, message: &str) -> Value {
    json!({
        "name": name,
        "email": "visitor@site.org",
        "message": message,
        "botcheck": ""
    })
}

/// A submission as an automated form filler produces it: every field set.
pub fn bot_submission(i: usize) -> Value {
    json!({
        "name": format!("Visitor {}", i),
        "email": format!("v{}@site.org", i),
        "message": "Great site, we offer SEO services for you",
        "botcheck": "on"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }
}
