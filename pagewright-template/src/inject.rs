//! Snippet injection into finished HTML documents.

/// Attribute carried by the behavior script; its presence marks a document
/// that already has the script.
pub const BEHAVIOR_MARKER: &str = "data-pagewright-behavior";

/// Client behavior shared by rendered and published pages: form popup
/// triggers, accordion toggles and tab switching.
pub const BEHAVIOR_SCRIPT: &str = r#"<script data-pagewright-behavior>
(function () {
  function openPopup(id) {
    var el = document.querySelector('[data-popup="' + id + '"]');
    if (el) { el.hidden = false; el.classList.add('is-open'); }
  }
  function closePopup(el) {
    el.hidden = true; el.classList.remove('is-open');
  }
  document.addEventListener('click', function (ev) {
    var t = ev.target.closest('[data-popup-trigger],[data-popup-close],[data-accordion-trigger],[data-tab]');
    if (!t) { return; }
    if (t.hasAttribute('data-popup-trigger')) {
      ev.preventDefault();
      openPopup(t.getAttribute('data-popup-trigger'));
    } else if (t.hasAttribute('data-popup-close')) {
      var popup = t.closest('[data-popup]');
      if (popup) { closePopup(popup); }
    } else if (t.hasAttribute('data-accordion-trigger')) {
      var item = t.closest('[data-accordion-item]');
      if (item) { item.classList.toggle('is-open'); }
    } else if (t.hasAttribute('data-tab')) {
      var group = t.closest('[data-tabs]');
      if (!group) { return; }
      var name = t.getAttribute('data-tab');
      group.querySelectorAll('[data-tab]').forEach(function (b) {
        b.classList.toggle('is-active', b === t);
      });
      group.querySelectorAll('[data-tab-panel]').forEach(function (p) {
        p.hidden = p.getAttribute('data-tab-panel') !== name;
      });
    }
  });
})();
</script>"#;

const BODY_CLOSE: &str = "</body>";

/// Insert `snippet` immediately before the last `</body>` (matched ASCII
/// case-insensitively), or append it when the document has no body close.
/// A document that already contains the snippet is returned unchanged.
pub fn inject_before_body_close(document: &str, snippet: &str) -> String {
    if snippet.is_empty() || document.contains(snippet) {
        return document.to_string();
    }
    let mut out = String::with_capacity(document.len() + snippet.len() + 1);
    match rfind_ascii_ci(document, BODY_CLOSE) {
        Some(idx) => {
            out.push_str(&document[..idx]);
            out.push_str(snippet);
            out.push('\n');
            out.push_str(&document[idx..]);
        }
        None => {
            out.push_str(document);
            out.push_str(snippet);
        }
    }
    out
}

/// Inject [`BEHAVIOR_SCRIPT`] unless a script carrying [`BEHAVIOR_MARKER`]
/// is already present.
pub fn inject_behavior_script(document: &str) -> String {
    if document.contains(BEHAVIOR_MARKER) {
        return document.to_string();
    }
    inject_before_body_close(document, BEHAVIOR_SCRIPT)
}

fn rfind_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    // ASCII lowercasing keeps byte offsets identical.
    haystack.to_ascii_lowercase().rfind(needle)
}
