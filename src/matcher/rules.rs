//! Built-in fingerprint definitions

/// Static description of a built-in fingerprint category
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub name: &'static str,
    pub output_prefix: &'static str,
    /// `(rule name, pattern)` in evaluation order
    pub rules: &'static [(&'static str, &'static str)],
}

/// WordPress comment form markers
pub const WORDPRESS: CategorySpec = CategorySpec {
    name: "wordpress",
    output_prefix: "WP-site",
    rules: &[
        ("wp-comments-post", r#"wp-comments-post\.php"#),
        (
            "action-wp-comments-post",
            r#"action\s*=\s*["'][^"']*wp-comments-post\.php[^"']*["']"#,
        ),
        ("id=commentform", r#"id\s*=\s*["']commentform["']"#),
        (
            "class=comment-form",
            r#"class\s*=\s*["'][^"']*\bcomment-form\b[^"']*["']"#,
        ),
    ],
};

/// Wix site-builder generator tag
pub const WIX: CategorySpec = CategorySpec {
    name: "wix",
    output_prefix: "WIX-site",
    rules: &[(
        "wix-generator",
        r#"<meta[^>]+name\s*=\s*["']generator["'][^>]+content\s*=\s*["'][^"']*Wix[^"']*["']"#,
    )],
};

pub const BUILTIN_CATEGORIES: &[CategorySpec] = &[WORDPRESS, WIX];
