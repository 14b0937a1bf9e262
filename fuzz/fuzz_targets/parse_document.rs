#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Leading byte selects the hint so one corpus covers every cascade level.
    let (hint, html) = match data.split_first() {
        Some((selector, rest)) => {
            let hint = match selector % 4 {
                0 => None,
                1 => Some("utf-8"),
                2 => Some("text/html; charset=shift_jis"),
                _ => Some("x-unknown"),
            };
            (hint, rest)
        }
        None => (None, data),
    };

    let doc = htmltext::parse(html, hint);

    if doc.content.is_empty() {
        assert!(doc.parastarts.is_empty());
    } else {
        assert_eq!(doc.parastarts.first(), Some(&0));
    }
    for pair in doc.parastarts.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    for &start in &doc.parastarts {
        assert!(doc.content.is_char_boundary(start) && start < doc.content.len());
    }

    for link in &doc.links {
        assert!(link.start_pos <= doc.content.len());
        assert_eq!(link.parent_tags.last().map(|frame| frame.name.as_str()), Some("a"));
        let expected = doc.paragraph_at(link.start_pos).unwrap_or_default();
        if link.start_pos < doc.content.len() {
            assert_eq!(link.para, expected);
        }
    }

    assert_eq!(doc, htmltext::parse(html, hint));
});
