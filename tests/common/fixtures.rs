//! Static Terraform log corpora used across harnesses.
//!
//! Each corpus is a `&'static [&'static str]` of JSON lines shaped like
//! `TF_LOG=json` output. Timestamps are fixed so ordering assertions are
//! stable.

/// One plan-and-apply run: two requests, a provider error, a payload dump.
pub const CORPUS_RUN: &[&str] = &[
    r#"{"@level":"info","@message":"Terraform version: 1.7.5","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:00.000000Z"}"#,
    r#"{"@level":"info","@message":"starting Plan operation","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:01.000000Z","tf_req_id":"req-1"}"#,
    r#"{"@level":"debug","@message":"Sending HTTP Request","@module":"provider.terraform-provider-aws","@timestamp":"2024-05-02T10:00:02.000000Z","tf_req_id":"req-1","tf_resource_type":"aws_instance","tf_rpc":"PlanResourceChange","tf_http_req_body":"Action=DescribeInstances {\"InstanceIds\":[\"i-0abc\"]}"}"#,
    r#"{"@level":"debug","@message":"Received HTTP Response","@module":"provider.terraform-provider-aws","@timestamp":"2024-05-02T10:00:03.000000Z","tf_req_id":"req-1","tf_resource_type":"aws_instance","tf_rpc":"PlanResourceChange","tf_http_res_body":"{\"Reservations\":[],\"vpc_id\":\"vpc-0badc0de\"}"}"#,
    r#"{"@level":"info","@message":"starting Apply operation","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:04.000000Z","tf_req_id":"req-2"}"#,
    r#"{"@level":"error","@message":"provider timeout while creating aws_s3_bucket.logs","@module":"provider.terraform-provider-aws","@timestamp":"2024-05-02T10:00:05.000000Z","tf_req_id":"req-2","tf_resource_type":"aws_s3_bucket","tf_rpc":"ApplyResourceChange"}"#,
    r#"{"@level":"warn","@message":"attention: deprecated argument","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:06.000000Z","tf_resource_type":"aws_s3_bucket"}"#,
    r#"{"@level":"info","@message":"running validation operation","@module":"terraform.ui","@timestamp":"2024-05-02T10:00:07.000000Z"}"#,
];

/// Lines without `@level`, classified by message keywords alone.
pub const CORPUS_UNLEVELLED: &[&str] = &[
    r#"{"@message":"Error: creating instance failed","@timestamp":"2024-05-02T11:00:00Z"}"#,
    r#"{"@message":"caution: state lock held","@timestamp":"2024-05-02T11:00:01Z"}"#,
    r#"{"@message":"trace: walking graph","@timestamp":"2024-05-02T11:00:02Z"}"#,
    r#"{"@message":"refreshing state","@timestamp":"2024-05-02T11:00:03Z"}"#,
];

/// A mix of valid lines and lines that must be rejected.
pub const CORPUS_DIRTY: &[&str] = &[
    r#"{"@level":"info","@message":"ok one"}"#,
    r#"{"@level":"info","@message":"truncated"#,
    r#"["not","an","object"]"#,
    r#"{"@level":"info","@message":"ok two"}"#,
    "plain text line",
    r#"{"@level":"info","@message":"ok three"}"#,
];

/// `n` generated lines cycling through levels, resources and requests.
pub fn generated_lines(n: usize) -> Vec<String> {
    const LEVELS: [&str; 4] = ["info", "debug", "warn", "error"];
    const RESOURCES: [&str; 3] = ["aws_instance", "aws_s3_bucket", "aws_iam_role"];
    (0..n)
        .map(|i| {
            serde_json::json!({
                "@level": LEVELS[i % LEVELS.len()],
                "@message": format!("generated message {i}"),
                "@timestamp": format!("2024-05-02T12:{:02}:{:02}Z", (i / 60) % 60, i % 60),
                "tf_req_id": format!("req-{}", i % 7),
                "tf_resource_type": RESOURCES[i % RESOURCES.len()],
            })
            .to_string()
        })
        .collect()
}
