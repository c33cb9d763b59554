//! # HTML 页面
//!
//! 服务端直接拼接的页面：提交表单、作业列表、作业详情。
//! 页面共用同一套页眉、页脚和样式。
//!
//! ## 依赖关系
//! - 被 `web/handlers.rs` 使用
//! - 使用 `models/`, `viewer/`, `web/form.rs`

use super::form::{BASIS_SETS, FUNCTIONALS};
use crate::models::{solvent, Job, JobStatus, DEFAULT_DIELECTRIC};
use crate::viewer::escape_html;

const TITLE: &str = "AutoDFT";
const SUBTITLE: &str = "DFT geometry optimization with implicit solvation";

const STYLE: &str = r#"
  body { margin: 0; font-family: "Times New Roman", serif; background: #f4f6f8; color: #1d2733; }
  .custom-header { position: fixed; top: 0; left: 0; width: 100%; height: 70px; z-index: 10;
    display: flex; flex-direction: column; align-items: center; justify-content: center;
    background: #ffffff; box-shadow: 0 4px 15px rgba(0, 0, 0, 0.15); }
  .custom-header .title { font-size: 25px; font-weight: bold; color: #1f4e79; margin: 0; }
  .custom-header .subtitle { font-size: 16px; color: #1f4e79; margin: 0; }
  .custom-header nav { position: absolute; right: 24px; top: 24px; }
  .custom-header nav a { color: #1f4e79; margin-left: 16px; text-decoration: none; }
  main { max-width: 960px; margin: 100px auto 80px; padding: 0 16px; }
  .card { background: #ffffff; border-radius: 10px; padding: 20px; margin-bottom: 20px;
    box-shadow: 0 2px 8px rgba(0, 0, 0, 0.08); }
  .row { display: flex; gap: 16px; flex-wrap: wrap; margin-bottom: 12px; }
  .row label { display: flex; flex-direction: column; font-size: 14px; min-width: 200px; }
  input, select { margin-top: 4px; padding: 6px; border: 1px solid #b8c2cc; border-radius: 6px; font-size: 14px; }
  button { background: #1f4e79; color: #ffffff; border: none; border-radius: 6px; padding: 8px 18px;
    font-size: 15px; cursor: pointer; margin-right: 8px; }
  button:disabled { opacity: 0.6; cursor: default; }
  .error { color: #b00020; white-space: pre-wrap; }
  .energy { font-size: 18px; font-weight: bold; }
  table { width: 100%; border-collapse: collapse; }
  th, td { text-align: left; padding: 6px 8px; border-bottom: 1px solid #e1e6eb; }
  .status-pending { color: #8a6d00; } .status-running { color: #1f4e79; }
  .status-completed { color: #1b7f3b; } .status-failed { color: #b00020; }
  iframe { border: none; width: 820px; height: 620px; }
  .custom-footer { position: fixed; bottom: 0; left: 0; width: 100%; background: #1f4e79;
    color: #ffffff; text-align: center; padding: 8px 0; font-size: 14px; }
"#;

const FORM_SCRIPT: &str = r#"
  const form = document.getElementById('optForm');
  const solvent = document.getElementById('solvent');
  const custom = document.getElementById('customDielectric');
  const status = document.getElementById('status');
  const result = document.getElementById('result');

  solvent.addEventListener('change', () => {
    custom.style.display = solvent.value === 'other' ? 'inline-block' : 'none';
  });

  function buildData() {
    const data = new FormData(form);
    const eps = solvent.value === 'other' ? custom.value : solvent.value;
    data.set('dielectric', eps);
    return data;
  }

  function setBusy(busy) {
    for (const b of form.querySelectorAll('button')) b.disabled = busy;
  }

  async function post(url) {
    status.textContent = url.endsWith('run-opt') ? 'Running geometry optimization...' : 'Submitting job...';
    status.className = '';
    result.innerHTML = '';
    setBusy(true);
    try {
      const resp = await fetch(url, { method: 'POST', body: buildData() });
      const body = await resp.json();
      if (!resp.ok) {
        status.className = 'error';
        status.textContent = body.error + (body.details ? ': ' + body.details : '');
        return null;
      }
      return body;
    } catch (e) {
      status.className = 'error';
      status.textContent = 'Request failed: ' + e;
      return null;
    } finally {
      setBusy(false);
    }
  }

  document.getElementById('runBtn').addEventListener('click', async () => {
    const body = await post('/api/run-opt');
    if (!body) return;
    status.textContent = 'Optimization finished.';
    const energy = document.createElement('p');
    energy.className = 'energy';
    energy.textContent = 'Optimized geometry with energy: ' + body.energy.toFixed(2) + ' kJ/mol';
    const frame = document.createElement('iframe');
    frame.srcdoc = body.viewerHtml;
    const link = document.createElement('a');
    link.href = 'data:chemical/x-xyz;charset=utf-8,' + encodeURIComponent(body.xyz);
    link.download = body.xyzFileName;
    link.textContent = 'Download ' + body.xyzFileName;
    result.append(energy, link, frame);
  });

  document.getElementById('submitBtn').addEventListener('click', async () => {
    const body = await post('/api/jobs/submit');
    if (!body) return;
    status.innerHTML = 'Job <a href="/jobs/' + body.jobId + '">#' + body.jobId + '</a> queued.';
  });
"#;

/// 套上页眉、页脚和样式
fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{page_title}</title>
<style>{style}</style>
</head>
<body>
<div class="custom-header">
  <p class="title">{title}</p>
  <p class="subtitle">{subtitle}</p>
  <nav><a href="/">New calculation</a><a href="/jobs">Jobs</a></nav>
</div>
<main>
{content}
</main>
<div class="custom-footer">{title} &middot; PySCF / gpu4pyscf &middot; IEF-PCM</div>
</body>
</html>
"#,
        page_title = escape_html(title),
        style = STYLE,
        title = TITLE,
        subtitle = SUBTITLE,
        content = content
    )
}

/// 溶剂下拉框：常用溶剂在前，其余放入分组，最后是自定义
fn solvent_options() -> String {
    let option = |s: &solvent::Solvent| {
        let selected = if (s.dielectric - DEFAULT_DIELECTRIC).abs() < 1e-9 { " selected" } else { "" };
        format!(
            "<option value=\"{}\"{}>{} ({})</option>\n",
            s.dielectric,
            selected,
            escape_html(s.name),
            s.dielectric
        )
    };

    let mut html = String::new();
    for s in solvent::SOLVENTS.iter().filter(|s| s.featured) {
        html.push_str(&option(s));
    }
    html.push_str("<optgroup label=\"More solvents\">\n");
    for s in solvent::SOLVENTS.iter().filter(|s| !s.featured) {
        html.push_str(&option(s));
    }
    html.push_str("</optgroup>\n<option value=\"other\">Others (custom value)</option>\n");
    html
}

fn select_options(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("<option value=\"{0}\">{0}</option>", escape_html(v)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 首页表单
pub fn index_page() -> String {
    let content = format!(
        r#"<div class="card">
<h3>Geometry optimization</h3>
<form id="optForm" onsubmit="return false;">
  <div class="row">
    <label>Structure file (.xyz, .sdf, .mol, .mol2, .pdb)
      <input type="file" name="structureFile" accept=".xyz,.sdf,.mol,.mol2,.pdb" required>
    </label>
  </div>
  <div class="row">
    <label>Solvent
      <select id="solvent">
{solvents}      </select>
      <input id="customDielectric" type="number" step="any" min="0" placeholder="Dielectric constant" style="display: none;">
    </label>
    <label>Functional
      <select name="functional">{functionals}</select>
    </label>
    <label>Basis set
      <select name="basis">{basis}</select>
    </label>
    <label>Charge
      <input type="number" name="charge" value="0" step="1">
    </label>
  </div>
  <button type="button" id="runBtn">Optimize</button>
  <button type="button" id="submitBtn">Submit job</button>
</form>
</div>
<div class="card">
  <div id="status"></div>
  <div id="result"></div>
</div>
<script>{script}</script>
"#,
        solvents = solvent_options(),
        functionals = select_options(&FUNCTIONALS),
        basis = select_options(&BASIS_SETS),
        script = FORM_SCRIPT
    );
    layout(TITLE, &content)
}

fn status_cell(status: JobStatus) -> String {
    format!("<span class=\"status-{0}\">{0}</span>", status)
}

fn energy_text(job: &Job) -> String {
    job.energy
        .map(|e| format!("{:.2} kJ/mol", e))
        .unwrap_or_else(|| "-".to_string())
}

/// 作业列表
pub fn jobs_page(jobs: &[Job]) -> String {
    let mut content = String::from("<div class=\"card\">\n<h3>Jobs</h3>\n");
    if jobs.is_empty() {
        content.push_str("<p>No jobs submitted yet.</p>\n");
    } else {
        content.push_str(
            "<table>\n<tr><th>Job</th><th>Input</th><th>Solvent &epsilon;</th><th>Method</th><th>Status</th><th>Energy</th><th>Submitted</th></tr>\n",
        );
        for job in jobs {
            content.push_str(&format!(
                "<tr><td><a href=\"/jobs/{id}\">#{id}</a></td><td>{input}</td><td>{eps}</td><td>{func}/{basis}</td><td>{status}</td><td>{energy}</td><td>{created}</td></tr>\n",
                id = job.job_id,
                input = escape_html(&job.input_file),
                eps = job.parameters.dielectric,
                func = escape_html(&job.parameters.functional),
                basis = escape_html(&job.parameters.basis),
                status = status_cell(job.status),
                energy = energy_text(job),
                created = job.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            ));
        }
        content.push_str("</table>\n");
    }
    content.push_str("</div>\n");
    layout("Jobs - AutoDFT", &content)
}

/// 作业详情，`viewer` 为已渲染好的结构查看器片段
pub fn job_page(job: &Job, viewer: Option<&str>) -> String {
    let mut content = format!(
        r#"<div class="card">
<h3>Job #{id}</h3>
<table>
<tr><th>Status</th><td>{status}</td></tr>
<tr><th>Input file</th><td>{input}</td></tr>
<tr><th>Dielectric constant</th><td>{eps}</td></tr>
<tr><th>Functional / basis</th><td>{func} / {basis}</td></tr>
<tr><th>Charge</th><td>{charge}</td></tr>
<tr><th>Retries</th><td>{retries}</td></tr>
<tr><th>Submitted</th><td>{created}</td></tr>
<tr><th>Energy</th><td class="energy">{energy}</td></tr>
"#,
        id = job.job_id,
        status = status_cell(job.status),
        input = escape_html(&job.input_file),
        eps = job.parameters.dielectric,
        func = escape_html(&job.parameters.functional),
        basis = escape_html(&job.parameters.basis),
        charge = job.parameters.charge,
        retries = job.retry_count,
        created = job.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        energy = energy_text(job),
    );

    if let Some(done) = job.completed_at {
        content.push_str(&format!(
            "<tr><th>Finished</th><td>{}</td></tr>\n",
            done.format("%Y-%m-%d %H:%M:%S UTC")
        ));
    }
    if let Some(err) = &job.error {
        content.push_str(&format!(
            "<tr><th>Last error</th><td class=\"error\">{}</td></tr>\n",
            escape_html(err)
        ));
    }
    content.push_str("</table>\n");

    if job.status == JobStatus::Completed {
        content.push_str(&format!(
            "<p><a href=\"/api/jobs/{}/download\">Download optimized geometry (XYZ)</a></p>\n",
            job.job_id
        ));
    } else if !job.is_finished() {
        content.push_str("<p>This page refreshes every 10 seconds.</p>\n<script>setTimeout(() => location.reload(), 10000);</script>\n");
    }
    content.push_str("</div>\n");

    if let Some(viewer) = viewer {
        content.push_str("<div class=\"card\">\n");
        content.push_str(viewer);
        content.push_str("</div>\n");
    }

    layout(&format!("Job #{} - AutoDFT", job.job_id), &content)
}
