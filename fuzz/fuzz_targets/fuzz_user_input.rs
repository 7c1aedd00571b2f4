#![no_main]

use ishy_client::nickname::{validate_nickname, NICKNAME_MAX_LEN, NICKNAME_MIN_LEN};
use ishy_client::Identity;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(id) = Identity::parse(s) {
        assert!(!id.as_str().is_empty());
        assert!(id.as_str().bytes().all(|b| b.is_ascii_digit()));
    }

    if let Ok(nickname) = validate_nickname(s) {
        let len = nickname.chars().count();
        assert!((NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&len));
        assert_eq!(nickname, nickname.trim());
    }
});
