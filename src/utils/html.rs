/// Sanitizes user-written post and comment bodies before they are stored.
///
/// Allow-list based (via `ammonia`): harmless markup such as `<b>` or `<p>`
/// survives, `<script>`/`<iframe>` and event-handler attributes are removed
/// together with the content of `<script>`.
pub fn sanitize_text(input: &str) -> String {
    ammonia::clean(input)
}
