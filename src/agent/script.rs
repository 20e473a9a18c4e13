//! JavaScript bootstrap injected before content load.
//!
//! The template is rendered with the session key, the refresh sentinel and the
//! policy record; it mirrors `session::DocumentAgent` step for step.

use super::policy::{AgentPolicy, FRAME_FALLBACK_MS, REFRESH_SENTINEL, SESSION_KEY};

const BOOTSTRAP_TEMPLATE: &str = r#"
(function () {
    var KEY = #SESSION_KEY#;
    var SENTINEL = #SENTINEL#;
    var POLICY = #POLICY_JSON#;
    var FRAME_FALLBACK_MS = #FRAME_FALLBACK_MS#;

    var existing = window[KEY];
    if (existing && typeof existing.refresh === 'function') {
        existing.refresh();
        return;
    }

    var state = {
        lastPosted: null,
        suspectStreak: 0,
        pendingPass: null,
        debounce: null,
        fallbackDelay: POLICY.fallback_initial_ms,
        mediaInFlight: 0,
        disposers: [],
        destroyed: false
    };
    var session = { state: state, refresh: refresh, destroy: destroy };
    window[KEY] = session;

    var tracked = typeof WeakSet === 'function' ? new WeakSet() : null;
    var observedBody = null;
    var resizeObserver = null;

    // --- REGISTRATION ---

    function register(dispose) {
        state.disposers.push(dispose);
        return dispose;
    }

    function forget(dispose) {
        var i = state.disposers.indexOf(dispose);
        if (i >= 0) state.disposers.splice(i, 1);
    }

    function listen(target, type, handler) {
        if (!target || typeof target.addEventListener !== 'function') return null;
        target.addEventListener(type, handler, false);
        return register(function () { target.removeEventListener(type, handler, false); });
    }

    function later(delay, fn) {
        if (typeof setTimeout !== 'function') return null;
        var dispose = null;
        var id = setTimeout(function () {
            forget(dispose);
            if (!state.destroyed) fn();
        }, delay);
        dispose = register(function () { clearTimeout(id); });
        return dispose;
    }

    // --- MEASUREMENT ---

    function setIfUnset(el, prop, value) {
        if (el && el.style && !el.style[prop]) el.style[prop] = value;
    }

    function normalizeStyles() {
        [document.documentElement, document.body].forEach(function (el) {
            setIfUnset(el, 'backgroundColor', 'transparent');
            setIfUnset(el, 'overflow', 'hidden');
            setIfUnset(el, 'height', 'auto');
        });
    }

    function scrollContainer() {
        var el = document.scrollingElement;
        return el && el !== document.documentElement ? el : null;
    }

    function tallest(el) {
        if (!el) return 0;
        var rect = 0;
        try { rect = el.getBoundingClientRect().height; } catch (e) {}
        var values = [rect, el.scrollHeight, el.offsetHeight, el.clientHeight];
        var best = 0;
        for (var i = 0; i < values.length; i++) {
            if (isFinite(values[i]) && values[i] > best) best = values[i];
        }
        return best;
    }

    function candidate() {
        var floor = isFinite(window.innerHeight) ? Math.max(0, window.innerHeight) : 0;
        return Math.max(floor, tallest(document.documentElement), tallest(scrollContainer()), tallest(document.body));
    }

    function post(height) {
        try {
            if (window.ipc && typeof window.ipc.postMessage === 'function') {
                window.ipc.postMessage(String(height));
                return true;
            }
        } catch (e) {}
        return false;
    }

    function admit(value) {
        if (!isFinite(value) || value <= 0) return null;
        var height = Math.ceil(value);
        if (height === state.lastPosted) {
            state.suspectStreak = 0;
            return null;
        }
        var ceiling = POLICY.anomaly_ceiling_px;
        if (height >= ceiling && (state.lastPosted === null || state.lastPosted < ceiling)) {
            state.suspectStreak += 1;
            if (state.suspectStreak < Math.max(1, POLICY.anomaly_confirmations)) {
                schedulePass(true);
                return null;
            }
        }
        state.suspectStreak = 0;
        return height;
    }

    function measure() {
        if (state.destroyed) return;
        var height = admit(candidate());
        if (height !== null && post(height)) state.lastPosted = height;
    }

    // A deferred reading is only confirmed by a later pass, never inline.
    function schedulePass(deferred) {
        if (state.destroyed || state.pendingPass) return;
        if (typeof window.requestAnimationFrame === 'function') {
            var dispose = null;
            var id = window.requestAnimationFrame(function () {
                forget(dispose);
                state.pendingPass = null;
                measure();
            });
            dispose = register(function () { window.cancelAnimationFrame(id); });
            state.pendingPass = dispose;
        } else {
            state.pendingPass = later(FRAME_FALLBACK_MS, function () {
                state.pendingPass = null;
                measure();
            });
            if (!state.pendingPass && !deferred) measure();
        }
    }

    function refresh() {
        if (state.destroyed) return;
        state.lastPosted = null;
        measure();
    }

    function destroy() {
        if (state.destroyed) return;
        state.destroyed = true;
        var disposers = state.disposers.splice(0);
        for (var i = 0; i < disposers.length; i++) {
            try { disposers[i](); } catch (e) {}
        }
        if (window[KEY] === session) {
            try { delete window[KEY]; } catch (e) { window[KEY] = undefined; }
        }
    }

    // --- MEDIA ---

    function isSettled(el) {
        switch (el.tagName) {
            case 'IMG': return !!el.complete;
            case 'VIDEO': return el.readyState >= 2;
            case 'IFRAME':
                try {
                    var doc = el.contentDocument;
                    return !!doc && doc.readyState === 'complete';
                } catch (e) {
                    return false;
                }
            default: return true;
        }
    }

    function markTracked(el) {
        if (tracked) {
            if (tracked.has(el)) return false;
            tracked.add(el);
            return true;
        }
        if (el[KEY + 'Tracked']) return false;
        el[KEY + 'Tracked'] = true;
        return true;
    }

    function trackMedia(node) {
        if (!node || node.nodeType !== 1 && node.nodeType !== 9) return;
        var tag = node.tagName;
        if (tag !== 'IMG' && tag !== 'VIDEO' && tag !== 'IFRAME') {
            if (typeof node.querySelectorAll === 'function') {
                var nested = node.querySelectorAll('img,video,iframe');
                for (var i = 0; i < nested.length; i++) trackMedia(nested[i]);
            }
            return;
        }
        if (!markTracked(node) || isSettled(node)) return;

        state.mediaInFlight += 1;
        var own = [];
        var done = false;
        function settle() {
            if (done) return;
            done = true;
            own.forEach(function (dispose) { forget(dispose); dispose(); });
            state.mediaInFlight = Math.max(0, state.mediaInFlight - 1);
            measure();
        }
        ['load', 'error', 'loadeddata', 'loadedmetadata', 'ended'].forEach(function (type) {
            var dispose = listen(node, type, settle);
            if (dispose) own.push(dispose);
        });
    }

    // --- TRIGGERS ---

    function onMutations(records) {
        for (var i = 0; i < records.length; i++) {
            var added = records[i].addedNodes;
            for (var j = 0; added && j < added.length; j++) trackMedia(added[j]);
        }
        if (state.debounce) return;
        var cooldown = state.mediaInFlight > 0
            ? POLICY.mutation_cooldown_busy_ms
            : POLICY.mutation_cooldown_idle_ms;
        state.debounce = later(cooldown, function () {
            state.debounce = null;
            schedulePass();
        });
        if (!state.debounce) schedulePass();
    }

    function attachBody() {
        normalizeStyles();
        if (resizeObserver && document.body && observedBody !== document.body) {
            observedBody = document.body;
            resizeObserver.observe(document.body);
            var scroller = scrollContainer();
            if (scroller && scroller !== document.body) resizeObserver.observe(scroller);
        }
        trackMedia(document);
    }

    function onDocumentProgress() {
        attachBody();
        measure();
    }

    function onControl(event) {
        var data = event ? event.data : null;
        if (data === SENTINEL) {
            refresh();
        } else if (typeof data === 'string' && data.trim().charCodeAt(0) === 0x7b) {
            try {
                var parsed = JSON.parse(data);
                if (parsed && parsed.type === SENTINEL) refresh();
            } catch (e) {}
        } else if (data && typeof data === 'object' && data.type === SENTINEL) {
            refresh();
        }
    }

    if (typeof MutationObserver === 'function') {
        var mutationObserver = new MutationObserver(onMutations);
        mutationObserver.observe(document, { attributes: true, childList: true, characterData: true, subtree: true });
        register(function () { mutationObserver.disconnect(); });
    }

    if (typeof ResizeObserver === 'function') {
        resizeObserver = new ResizeObserver(function () { schedulePass(); });
        if (document.documentElement) resizeObserver.observe(document.documentElement);
        register(function () { resizeObserver.disconnect(); });
    }

    var viewport = window.visualViewport;
    if (viewport) {
        listen(viewport, 'resize', measure);
        listen(viewport, 'scroll', measure);
    }
    listen(window, 'orientationchange', measure);
    listen(window, 'resize', measure);
    listen(window, 'pageshow', measure);
    listen(document, 'readystatechange', onDocumentProgress);
    listen(document, 'DOMContentLoaded', onDocumentProgress);

    listen(window, 'message', onControl);
    listen(document, 'message', onControl);

    listen(window, 'pagehide', function (event) { if (!event || !event.persisted) destroy(); });
    listen(window, 'unload', destroy);

    function armFallback(delay) {
        later(delay, function () {
            measure();
            var growth = isFinite(POLICY.fallback_growth) && POLICY.fallback_growth >= 1 ? POLICY.fallback_growth : 1;
            var next = Math.min(POLICY.fallback_max_ms, Math.ceil(Math.max(1, delay) * growth));
            state.fallbackDelay = next;
            armFallback(next);
        });
    }
    armFallback(state.fallbackDelay);

    POLICY.forced_remeasure_ms.forEach(function (delay) { later(delay, measure); });

    attachBody();
    measure();
})();
"#;

/// Render the bootstrap with the given policy.
pub fn bootstrap_script(policy: &AgentPolicy) -> String {
    let policy_json = serde_json::to_string(policy).unwrap_or_else(|_| "{}".to_string());
    BOOTSTRAP_TEMPLATE
        .replace("#SESSION_KEY#", &js_string(SESSION_KEY))
        .replace("#SENTINEL#", &js_string(REFRESH_SENTINEL))
        .replace("#POLICY_JSON#", &policy_json)
        .replace("#FRAME_FALLBACK_MS#", &FRAME_FALLBACK_MS.to_string())
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_placeholder_is_filled() {
        let script = bootstrap_script(&AgentPolicy::default());
        for placeholder in ["#SESSION_KEY#", "#SENTINEL#", "#POLICY_JSON#", "#FRAME_FALLBACK_MS#"] {
            assert!(!script.contains(placeholder), "{placeholder} left in script");
        }
        assert!(script.contains(r#"var KEY = "__webviewAutoHeight";"#));
        assert!(script.contains(r#"var SENTINEL = "__AUTOHEIGHT_REFRESH__";"#));
    }

    #[test]
    fn policy_values_reach_the_script() {
        let policy = AgentPolicy {
            mutation_cooldown_idle_ms: 777,
            forced_remeasure_ms: vec![11, 22],
            anomaly_ceiling_px: 31_337,
            ..AgentPolicy::default()
        };
        let script = bootstrap_script(&policy);
        assert!(script.contains(r#""mutation_cooldown_idle_ms":777"#));
        assert!(script.contains(r#""forced_remeasure_ms":[11,22]"#));
        assert!(script.contains(r#""anomaly_ceiling_px":31337"#));
    }

    #[test]
    fn guard_runs_before_any_installation() {
        let script = bootstrap_script(&AgentPolicy::default());
        let guard = script.find("existing.refresh()").unwrap();
        let first_observer = script.find("new MutationObserver").unwrap();
        assert!(guard < first_observer);
    }

    #[test]
    fn braces_and_parens_balance() {
        let script = bootstrap_script(&AgentPolicy::default());
        let count = |c: char| script.chars().filter(|&x| x == c).count();
        assert_eq!(count('{'), count('}'));
        assert_eq!(count('('), count(')'));
        assert_eq!(count('['), count(']'));
    }
}
