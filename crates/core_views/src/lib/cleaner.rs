use std::sync::LazyLock;

use regex::Regex;

/// Promotional phrases creators append to subtitles and descriptions.
pub const PROMO_PHRASES: [&str; 10] = [
    "关注我",
    "一键三连",
    "点赞投币收藏",
    "记得三连",
    "感谢观看",
    "欢迎订阅",
    "喜欢的话",
    "下期再见",
    "更多精彩",
    "敬请期待",
];

static SPACE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").unwrap());

/// Flattens line breaks, strips promotional phrases and collapses spaces.
///
/// Phrase matching is exact and case-sensitive with no word boundaries.
/// Removal repeats until no phrase remains, since cutting one phrase out can
/// splice two fragments into another.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = text.replace(['\n', '\r'], " ");

    loop {
        let before = cleaned.len();
        for phrase in PROMO_PHRASES {
            cleaned = cleaned.replace(phrase, "");
        }
        if cleaned.len() == before {
            break;
        }
    }

    SPACE_RUN_RE.replace_all(&cleaned, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_flattens_line_breaks() {
        assert_eq!(clean_text("第一行\n第二行\r\n第三行"), "第一行 第二行 第三行");
    }

    #[test]
    fn test_removes_each_promo_phrase() {
        for phrase in PROMO_PHRASES {
            let input = format!("今天讲 Rust {phrase} 所有权");
            let cleaned = clean_text(&input);
            assert!(!cleaned.contains(phrase), "{phrase} survived in {cleaned}");
            assert_eq!(cleaned, "今天讲 Rust 所有权");
        }
    }

    #[test]
    fn test_phrase_matching_is_case_sensitive_substring() {
        assert_eq!(clean_text("别忘了一键三连哦"), "别忘了哦");
        assert_eq!(clean_text("Subscribe"), "Subscribe");
    }

    #[test]
    fn test_removal_that_splices_a_new_phrase() {
        assert_eq!(clean_text("关注关注我我"), "");
    }

    #[test]
    fn test_only_promo_yields_empty() {
        assert_eq!(clean_text("  感谢观看\n下期再见  "), "");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "视频标题  简介\n\n关注我，一键三连",
            "  plain   text  ",
            "更多精彩\r\n敬请期待 内容",
        ];
        for input in inputs {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once);
        }
    }
}
