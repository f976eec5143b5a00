//! Single-page UI served at `/`.
//!
//! Plain HTML + fetch against the `/api/sessions` routes; the session id
//! lives in the page only, so a reload starts over and the abandoned session
//! is left to the registry's idle expiry.

use axum::response::Html;

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>Career Day Simulator</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      display: flex; min-height: 100vh;
    }
    aside {
      width: 260px; padding: 1.5rem; border-right: 1px solid #333;
      background: #161616; display: flex; flex-direction: column; gap: 0.75rem;
    }
    main { flex: 1; display: flex; flex-direction: column; max-width: 860px; margin: 0 auto; padding: 1.5rem; gap: 1rem; }
    h1 { font-size: 1.5rem; }
    h2 { font-size: 1rem; color: #aaa; }
    p.sub { color: #888; font-size: 0.9rem; }
    input {
      width: 100%; padding: 0.6rem 0.8rem; border-radius: 8px;
      border: 1px solid #333; background: #1a1a1a; color: #e0e0e0;
    }
    button {
      padding: 0.55rem 1.2rem; border-radius: 8px; border: none;
      background: #2a2a3a; color: #c0c0e0; cursor: pointer;
    }
    button:hover { background: #3a3a5a; }
    button:disabled { opacity: 0.5; cursor: wait; }
    .row { display: flex; gap: 0.5rem; }
    #chat { flex: 1; display: flex; flex-direction: column; gap: 0.75rem; overflow-y: auto; }
    .msg { padding: 0.8rem 1rem; border-radius: 10px; white-space: pre-wrap; line-height: 1.45; }
    .assistant { background: #1a1a24; border: 1px solid #2a2a3a; }
    .user { background: #1f2a1f; border: 1px solid #2f3f2f; align-self: flex-end; max-width: 80%; }
    #status { color: #888; font-size: 0.85rem; min-height: 1.2em; }
    #status.error { color: #e07070; }
    .done { color: #8fd18f; }
    #summary { display: none; border: 1px solid #333; border-radius: 10px; padding: 1rem; background: #1a1a1a; white-space: pre-wrap; }
  </style>
</head>
<body>
  <aside>
    <h2>Configuration</h2>
    <input id="api-key" type="password" placeholder="API key (optional)" />
    <button id="reset">Reset Simulation</button>
    <p class="sub" id="clock"></p>
  </aside>
  <main>
    <h1>Career Day Simulator</h1>
    <p class="sub">Experience a day in any career with AI agents</p>

    <div class="row" id="start-row">
      <input id="career" placeholder="e.g., Software Engineer, Chef, Doctor" />
      <button id="start">Start Simulation</button>
    </div>

    <div id="chat"></div>
    <div id="status"></div>

    <div class="row" id="decide-row" style="display:none">
      <input id="choice" placeholder="What do you do?" />
      <button id="decide">Send</button>
    </div>
    <div id="done-row" style="display:none">
      <p class="done">Career day complete!</p>
      <button id="summarize">Generate Summary</button>
    </div>
    <div id="summary"></div>
  </main>
<script>
  const $ = (id) => document.getElementById(id);
  let sessionId = null;

  function setStatus(text, isError) {
    $("status").textContent = text || "";
    $("status").className = isError ? "error" : "";
  }

  function busy(on) {
    for (const id of ["start", "decide", "summarize", "reset"]) $(id).disabled = on;
  }

  function render(session) {
    const chat = $("chat");
    chat.innerHTML = "";
    for (const m of session.messages) {
      const div = document.createElement("div");
      div.className = "msg " + m.role;
      div.textContent = m.content;
      chat.appendChild(div);
    }
    chat.scrollTop = chat.scrollHeight;
    $("clock").textContent = session.state.time + " - scenario " +
      session.state.scenarios_completed + "/" + session.max_scenarios;
    $("start-row").style.display = "none";
    $("decide-row").style.display = session.complete ? "none" : "flex";
    $("done-row").style.display = session.complete ? "block" : "none";
  }

  async function call(method, url, body) {
    const resp = await fetch(url, {
      method,
      headers: body ? { "content-type": "application/json" } : {},
      body: body ? JSON.stringify(body) : undefined,
    });
    const text = await resp.text();
    let data = null;
    try { data = text ? JSON.parse(text) : null; } catch (_) { data = { message: text }; }
    if (!resp.ok) throw new Error((data && data.message) || resp.statusText);
    return data;
  }

  $("start").onclick = async () => {
    const career = $("career").value.trim();
    if (!career) return;
    busy(true); setStatus("Agents analyzing career...");
    try {
      const key = $("api-key").value.trim();
      const data = await call("POST", "/api/sessions", key ? { career, api_key: key } : { career });
      sessionId = data.session_id;
      render(data.session);
      setStatus("");
    } catch (e) { setStatus(e.message, true); }
    busy(false);
  };

  $("decide").onclick = async () => {
    const choice = $("choice").value.trim();
    if (!choice || !sessionId) return;
    busy(true); setStatus("Agents processing...");
    try {
      const data = await call("POST", "/api/sessions/" + sessionId + "/decision", { choice });
      $("choice").value = "";
      render(data.session);
      const insight = data.state.last_insight;
      setStatus(insight ? "Professional insight: " + insight : "");
    } catch (e) { setStatus(e.message, true); }
    busy(false);
  };

  $("summarize").onclick = async () => {
    if (!sessionId) return;
    busy(true); setStatus("Generating summary...");
    try {
      const s = await call("POST", "/api/sessions/" + sessionId + "/summary");
      const box = $("summary");
      box.textContent = "Career: " + s.career + "\nScenarios: " + s.scenarios_completed +
        "\nSkills: " + s.skills.slice(0, 5).join(", ") + "\n\n" + s.summary;
      box.style.display = "block";
      setStatus("");
    } catch (e) { setStatus(e.message, true); }
    busy(false);
  };

  $("reset").onclick = async () => {
    if (sessionId) {
      try { await call("DELETE", "/api/sessions/" + sessionId); } catch (_) {}
    }
    sessionId = null;
    $("chat").innerHTML = "";
    $("summary").style.display = "none";
    $("clock").textContent = "";
    $("start-row").style.display = "flex";
    $("decide-row").style.display = "none";
    $("done-row").style.display = "none";
    setStatus("");
  };

  $("choice").addEventListener("keydown", (e) => { if (e.key === "Enter") $("decide").click(); });
  $("career").addEventListener("keydown", (e) => { if (e.key === "Enter") $("start").click(); });
</script>
</body>
</html>
"#;

/// GET /
pub(super) async fn root() -> Html<&'static str> {
    Html(INDEX_HTML)
}
