//! Embedded web chat page

use axum::response::{Html, IntoResponse};

/// Chat page
pub async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Index HTML template
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Clara</title>
    <style>
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #14161c;
            color: #e4e6eb;
            line-height: 1.6;
            height: 100vh;
            display: flex;
            flex-direction: column;
        }
        header {
            background: #1f2330;
            padding: 14px 20px;
            display: flex;
            justify-content: space-between;
            align-items: center;
            border-bottom: 1px solid #2c3142;
        }
        header h1 { font-size: 1.3em; font-weight: 600; }
        #status { font-size: 0.85em; color: #9aa0ae; }
        .dot { display: inline-block; width: 8px; height: 8px; border-radius: 50%; margin: 0 4px 0 10px; background: #555; }
        .dot.on { background: #4caf50; }
        main { flex: 1; overflow-y: auto; padding: 20px; }
        .msg { max-width: 760px; margin: 0 auto 14px; padding: 12px 16px; border-radius: 10px; white-space: pre-wrap; }
        .msg.user { background: #2b3a55; margin-right: 0; }
        .msg.clara { background: #232734; }
        .msg .meta { font-size: 0.75em; color: #8a90a0; margin-top: 6px; }
        footer { background: #1f2330; padding: 14px 20px; border-top: 1px solid #2c3142; }
        .composer { max-width: 760px; margin: 0 auto; display: flex; gap: 8px; }
        textarea {
            flex: 1; resize: none; height: 56px; padding: 10px;
            border-radius: 8px; border: 1px solid #3a4052; background: #14161c; color: inherit; font: inherit;
        }
        button, select {
            padding: 0 16px; border-radius: 8px; border: none;
            background: #5865f2; color: white; font: inherit; cursor: pointer;
        }
        select { background: #2c3142; }
        button:disabled { opacity: 0.5; cursor: wait; }
        #speak { background: #2c3142; }
    </style>
</head>
<body>
    <header>
        <h1>Clara</h1>
        <div id="status">connecting...</div>
    </header>
    <main id="log"></main>
    <footer>
        <div class="composer">
            <textarea id="input" placeholder="Talk to Clara..."></textarea>
            <select id="backend">
                <option value="auto">Auto</option>
                <option value="claude">Claude</option>
                <option value="gemini">Gemini</option>
            </select>
            <button id="speak" title="Speak replies">&#128264;</button>
            <button id="send">Send</button>
        </div>
    </footer>
    <script>
        const log = document.getElementById('log');
        const input = document.getElementById('input');
        const send = document.getElementById('send');
        const backend = document.getElementById('backend');
        const speakToggle = document.getElementById('speak');
        let speakReplies = false;

        function headers() {
            const h = { 'Content-Type': 'application/json' };
            const key = localStorage.getItem('claraKey');
            if (key) h['Authorization'] = 'Bearer ' + key;
            return h;
        }

        function append(role, text, meta) {
            const div = document.createElement('div');
            div.className = 'msg ' + role;
            div.textContent = text;
            if (meta) {
                const m = document.createElement('div');
                m.className = 'meta';
                m.textContent = meta;
                div.appendChild(m);
            }
            log.appendChild(div);
            log.scrollTop = log.scrollHeight;
        }

        async function refreshStatus() {
            try {
                const res = await fetch('/api/status', { headers: headers() });
                const s = await res.json();
                const b = s.backends;
                const dot = on => '<span class="dot' + (on ? ' on' : '') + '"></span>';
                document.getElementById('status').innerHTML =
                    dot(b.ollama.connected) + 'Ollama (' + b.ollama.model + ')' +
                    dot(b.claude.available) + 'Claude' +
                    dot(b.gemini.available) + 'Gemini' +
                    ' &middot; ' + s.memory.total_conversations + ' memories';
            } catch (e) {
                document.getElementById('status').textContent = 'offline';
            }
        }

        async function sendMessage() {
            const message = input.value.trim();
            if (!message) return;
            input.value = '';
            append('user', message);
            send.disabled = true;

            const body = { message };
            if (backend.value === 'claude') body.use_claude = true;
            if (backend.value === 'gemini') body.use_gemini = true;

            try {
                const res = await fetch('/api/chat', { method: 'POST', headers: headers(), body: JSON.stringify(body) });
                const data = await res.json();
                if (data.status === 'success') {
                    append('clara', data.response, data.backend + ' / ' + data.model);
                    if (speakReplies) {
                        fetch('/api/speak', { method: 'POST', headers: headers(), body: JSON.stringify({ text: data.response }) });
                    }
                } else {
                    append('clara', data.message || 'Something went wrong.');
                }
            } catch (e) {
                append('clara', 'Could not reach Clara: ' + e);
            } finally {
                send.disabled = false;
                refreshStatus();
            }
        }

        send.addEventListener('click', sendMessage);
        input.addEventListener('keydown', e => {
            if (e.key === 'Enter' && !e.shiftKey) { e.preventDefault(); sendMessage(); }
        });
        speakToggle.addEventListener('click', () => {
            speakReplies = !speakReplies;
            speakToggle.style.background = speakReplies ? '#5865f2' : '#2c3142';
        });

        fetch('/api/memory/recent?limit=10', { headers: headers() })
            .then(r => r.json())
            .then(items => items.forEach(c => {
                append('user', c.user_message);
                append('clara', c.assistant_response, [c.backend, c.model].filter(Boolean).join(' / '));
            }))
            .catch(() => {});
        refreshStatus();
        setInterval(refreshStatus, 30000);
    </script>
</body>
</html>
"#;
