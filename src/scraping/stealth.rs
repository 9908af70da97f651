//! Script injected with `Page.addScriptToEvaluateOnNewDocument` before the
//! product page loads. It runs in every frame, the review frame included.

/// Hides the automation markers the storefront's bot check reads.
/// `languages` follows the session locale so it agrees with `Accept-Language`.
pub fn stealth_script(locale: &str) -> String {
    let primary = locale.split('-').next().unwrap_or(locale);
    let languages = if primary == locale {
        format!("['{locale}']")
    } else {
        format!("['{locale}', '{primary}']")
    };

    format!(
        r#"
(() => {{
    try {{
        const proto = Navigator.prototype;

        // webdriver: absent (undefined) rather than false
        try {{
            Object.defineProperty(proto, 'webdriver', {{
                get: () => undefined,
                configurable: true,
            }});
        }} catch (e) {{}}
        try {{ delete navigator.webdriver; }} catch (e) {{}}

        try {{
            Object.defineProperty(proto, 'languages', {{
                get: () => {languages},
                configurable: true,
            }});
        }} catch (e) {{}}

        try {{
            Object.defineProperty(proto, 'plugins', {{
                get: () => [1, 2, 3, 4, 5],
                configurable: true,
            }});
        }} catch (e) {{}}
    }} catch (e) {{}}

    if (!window.chrome) {{
        window.chrome = {{}};
    }}
    if (!window.chrome.runtime) {{
        window.chrome.runtime = {{
            connect: function() {{ return {{ onDisconnect: {{ addListener: function() {{}} }} }}; }},
            sendMessage: function() {{}},
        }};
    }}

    const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
    if (originalQuery) {{
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications'
                ? Promise.resolve({{ state: Notification.permission }})
                : originalQuery(parameters)
        );
    }}
}})();
"#
    )
}
