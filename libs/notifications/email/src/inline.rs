//! Style inlining for HTML bodies.
//!
//! Many email clients drop `<style>` blocks, so rules are copied onto each
//! matching element's `style` attribute and the blocks are removed.

use crate::error::{MailError, MailResult};

pub fn inline_styles(html: &str) -> MailResult<String> {
    css_inline::inline(html).map_err(|e| MailError::StyleInline(e.to_string()))
}
