// SPDX-License-Identifier: MIT

//! Contract blocks: copy-pasteable instructions for a human or LLM agent
//! joining the work plan as a worker.

pub fn worker_contract(host: &str, port: u16, holder: &str) -> String {
    format!(
        r#"
+--------------------------------------------------------------+
|  WORKER CONTRACT -- paste into any agent/terminal pane        |
+--------------------------------------------------------------+
|                                                                |
|  You are a job worker. Your loop:                             |
|                                                                |
|  1. GET http://{host}:{port}/ready?holder={holder}
|     -> receive jobs array                                     |
|  2. For each job:                                              |
|     a. Read payload pointer (e.g. @file:path/to/spec)          |
|     b. Do the work described by the pointer                   |
|     c. POST /done  {{"id":"<job_id>","holder":"{holder}"}}
|        or POST /fail {{"id":"<job_id>","holder":"{holder}",
|                        "error":"reason"}}                     |
|  3. POST /heartbeat periodically for long jobs                |
|     {{"id":"<job_id>","holder":"{holder}"}}
|  4. Repeat from step 1                                         |
|                                                                |
|  RULES:                                                        |
|  - Payloads are POINTERS. Read the target, do the work.        |
|  - Additive changes only: adapters, stubs, new steps.          |
|  - Single-writer: produce a .diff OR a full file, never both.  |
|  - Capture new discoveries as new steps via POST /enqueue.     |
|                                                                |
|  CLI shortcut:                                                  |
|    jm worker --holder {holder} --poll 2
|                                                                |
+--------------------------------------------------------------+
"#
    )
}

pub fn executor_contract(host: &str, port: u16) -> String {
    format!(
        r#"
+--------------------------------------------------------------+
|  EXECUTOR CONTRACT -- for apply/verify/test jobs              |
+--------------------------------------------------------------+
|                                                                |
|  Run a local worker that auto-executes @cmd: and @file:       |
|  payloads against http://{host}:{port}:
|                                                                |
|    jm worker --mode local --holder exec-1 --poll 1              |
|                                                                |
|  This worker handles:                                          |
|  - @cmd:<shell>        -> runs the shell command               |
|  - @file:path#apply    -> applies a .diff patch                |
|  - @file:path#test     -> checks the file exists                |
|  - @doc:/@url:/@git:/@gh: -> marks done (metadata only)         |
|                                                                |
|  It does NOT handle a bare @file: pointer (LLM work).          |
|                                                                |
+--------------------------------------------------------------+
"#
    )
}
