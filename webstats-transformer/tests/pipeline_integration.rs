// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! End-to-end tests: raw events through mappers, aggregation and binding

use std::io::Write;
use std::sync::Arc;
use webstats_core::{
    AggregatedValue, BrowserDimension, DimensionConverter, InboundPattern, InboundSource,
    JobContext, KpiKind, OutputTable, PartialValue, PlatformDimension, RawEvent, Specialization,
    SqlParam, StatsKey,
};
use webstats_transformer::{
    Aggregator, CachedDimensionConverter, InMemoryDimensionConverter, InMemoryMemberRegistry,
    InboundResolver, JobConfig, JobKind, JsonLinesSink, MapperDeps, MemorySink, Pipeline,
};

const TS: i64 = 1_500_000_000_000;

fn deps() -> MapperDeps {
    MapperDeps {
        ctx: JobContext::utc("2017-07-15"),
        inbound: Arc::new(InboundResolver::new(
            vec![
                InboundPattern::new("www.baidu.com", 3),
                InboundPattern::new("www.google", 4),
            ],
            vec!["www.example.com".to_string()],
        )),
        members: Arc::new(InMemoryMemberRegistry::with_known(["m0"])),
    }
}

fn record(fields: &[(&str, &str)]) -> RawEvent {
    let map: serde_json::Map<String, serde_json::Value> = fields
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::from(*v)))
        .collect();
    serde_json::from_value(serde_json::Value::Object(map)).unwrap()
}

fn pageview(uuid: &str, sid: &str, referrer: &str) -> RawEvent {
    record(&[
        ("en", "e_pv"),
        ("u_ud", uuid),
        ("u_sd", sid),
        ("pl", "website"),
        ("p_ref", referrer),
        ("p_url", "http://www.example.com/item"),
        ("s_time", "1500000000000"),
    ])
}

#[test]
fn scenario_a_new_install_common_facts() {
    let mut mapper = JobKind::NewInstallUser.build_mapper(&deps());
    let facts = mapper.map(&record(&[
        ("u_ud", "u1"),
        ("s_time", "1500000000000"),
        ("pl", "java"),
    ]));

    assert_eq!(facts.len(), 2);
    let platforms: Vec<_> = facts.iter().map(|f| f.key.common.platform.clone()).collect();
    assert_eq!(platforms, vec![PlatformDimension::new("java"), PlatformDimension::all()]);
    for fact in &facts {
        assert_eq!(fact.value, PartialValue::time_marker("u1", TS));
        assert_eq!(fact.key.specialization, Specialization::None);
    }
}

#[test]
fn scenario_b_browser_fan_out() {
    let mut mapper = JobKind::NewInstallUser.build_mapper(&deps());
    let facts = mapper.map(&record(&[
        ("u_ud", "u1"),
        ("s_time", "1500000000000"),
        ("pl", "java"),
        ("b_n", "chrome"),
        ("b_v", "50"),
    ]));

    let browser_keys: Vec<&StatsKey> = facts
        .iter()
        .filter(|f| f.key.kpi() == KpiKind::BrowserNewInstallUser)
        .map(|f| &f.key)
        .collect();
    assert_eq!(browser_keys.len(), 6);

    for platform in [PlatformDimension::new("java"), PlatformDimension::all()] {
        let browsers: Vec<_> = browser_keys
            .iter()
            .filter(|key| key.common.platform == platform)
            .filter_map(|key| key.browser_dimension().cloned())
            .collect();
        assert_eq!(
            browsers,
            vec![
                BrowserDimension::new("chrome", Some("50")),
                BrowserDimension::all_versions("chrome"),
                BrowserDimension::all(),
            ]
        );
    }
}

#[test]
fn scenario_c_blank_uuid_is_filtered() {
    let mut mapper = JobKind::NewInstallUser.build_mapper(&deps());
    mapper.map(&record(&[("u_ud", "u1"), ("s_time", "1500000000000"), ("pl", "java")]));
    let before = mapper.counters();

    let facts = mapper.map(&record(&[("u_ud", ""), ("s_time", "1500000000000"), ("pl", "java")]));
    let after = mapper.counters();

    assert!(facts.is_empty());
    assert_eq!(after.filtered_records, before.filtered_records + 1);
    assert_eq!(after.output_records, before.output_records);
}

#[test]
fn scenario_d_inbound_resolution() {
    let mut mapper = JobKind::Inbound.build_mapper(&deps());

    let matched = mapper.map(&pageview("u1", "s1", "http://www.baidu.com/s?wd=rust"));
    assert!(matched
        .iter()
        .any(|f| f.key.inbound_source() == Some(InboundSource::Matched(3))));

    let other = mapper.map(&pageview("u1", "s1", "https://duckduckgo.com/?q=rust"));
    assert!(other
        .iter()
        .any(|f| f.key.inbound_source() == Some(InboundSource::Other)));

    let same_site = mapper.map(&pageview("u1", "s1", "http://www.example.com/index"));
    assert!(same_site.is_empty());
    assert_eq!(mapper.counters().filtered_records, 1);
}

#[test]
fn scenario_e_distinct_versus_raw_count() {
    let values: Vec<PartialValue> = ["u1", "u1", "u2"]
        .iter()
        .map(|id| PartialValue::time_marker(*id, TS))
        .collect();

    let mut mapper = JobKind::ActiveUser.build_mapper(&deps());
    let facts = mapper.map(&record(&[("u_ud", "u1"), ("s_time", "1500000000000"), ("pl", "java")]));
    let distinct_key = facts[0].key.clone();
    assert_eq!(distinct_key.kpi(), KpiKind::ActiveUser);

    let mut mapper = JobKind::Pageview.build_mapper(&deps());
    let facts = mapper.map(&pageview("u1", "s1", "http://www.baidu.com/"));
    let raw_key = facts[0].key.clone();
    assert_eq!(raw_key.kpi(), KpiKind::WebsitePageview);

    let aggregator = Aggregator::new(deps().ctx.offset);
    assert_eq!(
        aggregator.fold(&distinct_key, values.clone()).unwrap().value,
        AggregatedValue::Count(2)
    );
    assert_eq!(
        aggregator.fold(&raw_key, values).unwrap().value,
        AggregatedValue::Count(3)
    );
}

#[test]
fn inbound_job_binds_users_and_sessions() {
    let records = vec![
        pageview("u1", "s1", "http://www.baidu.com/a"),
        pageview("u1", "s1", "http://www.baidu.com/b"),
        pageview("u1", "s2", "http://www.google.com/"),
        pageview("u2", "s3", "http://www.example.com/"),
    ];
    let pipeline = Pipeline::new(JobKind::Inbound, deps()).unwrap();
    let converter = InMemoryDimensionConverter::new();
    let mut sink = MemorySink::new();
    let report = pipeline.run(&records, &converter, &mut sink).unwrap();

    assert_eq!(report.counters.filtered_records, 1);
    let rows = sink.rows_for(OutputTable::StatsInbound);
    // (all, website) x (all, baidu, google)
    assert_eq!(rows.len(), 6);

    let all_sources = rows
        .iter()
        .find(|row| row.params[2] == SqlParam::Id(1))
        .unwrap();
    assert_eq!(all_sources.params[3], SqlParam::Count(1));
    assert_eq!(all_sources.params[4], SqlParam::Count(2));
}

#[test]
fn bounce_job_counts_single_view_sessions() {
    let records = vec![
        pageview("u1", "s1", "http://www.baidu.com/a"),
        pageview("u1", "s1", "http://www.baidu.com/b"),
        pageview("u2", "s2", "http://www.baidu.com/"),
    ];
    let pipeline = Pipeline::new(JobKind::InboundBounce, deps()).unwrap();
    let mut sink = MemorySink::new();
    pipeline
        .run(&records, &InMemoryDimensionConverter::new(), &mut sink)
        .unwrap();

    let rows = sink.rows_for(OutputTable::StatsInbound);
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|row| row.params[3] == SqlParam::Count(1)));
    assert!(rows.iter().all(|row| row.kpi == KpiKind::InboundBounce));
}

#[test]
fn new_member_job_writes_member_info_once() {
    let member = |id: &str| {
        record(&[
            ("en", "e_pv"),
            ("u_mid", id),
            ("pl", "website"),
            ("s_time", "1500000000000"),
        ])
    };
    let records = vec![member("m1"), member("m1"), member("m2"), member("m0")];
    let pipeline = Pipeline::new(JobKind::NewMember, deps()).unwrap();
    let mut sink = MemorySink::new();
    let report = pipeline
        .run(&records, &InMemoryDimensionConverter::new(), &mut sink)
        .unwrap();

    assert_eq!(report.counters.filtered_records, 1);
    let members = sink.rows_for(OutputTable::MemberInfo);
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].params[0], SqlParam::Text("m1".to_string()));

    let users = sink.rows_for(OutputTable::StatsUser);
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|row| row.params[2] == SqlParam::Count(2)));
}

#[test]
fn active_user_job_fills_hourly_table() {
    let records = vec![
        record(&[("en", "e_l"), ("u_ud", "u1"), ("pl", "java"), ("s_time", "1500000000000")]),
        record(&[("en", "e_pv"), ("u_ud", "u2"), ("pl", "java"), ("s_time", "1500003600000")]),
    ];
    let pipeline = Pipeline::new(JobKind::ActiveUser, deps()).unwrap();
    let converter = CachedDimensionConverter::new(InMemoryDimensionConverter::new(), 1_000);
    let mut sink = MemorySink::new();
    pipeline.run(&records, &converter, &mut sink).unwrap();

    let hourly = sink.rows_for(OutputTable::StatsHourly);
    assert_eq!(hourly.len(), 2);
    for row in hourly {
        assert_eq!(row.params.len(), 52);
        assert_eq!(row.params[3 + 2], SqlParam::Count(1));
        assert_eq!(row.params[3 + 3], SqlParam::Count(1));
    }

    let kpi_id = converter.resolve(&KpiKind::HourlyActiveUser.into()).unwrap();
    assert_eq!(hourly[0].params[2], SqlParam::Id(kpi_id));
    assert!(converter.stats().hits > 0);
}

#[test]
fn config_file_drives_a_run() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[job]
run_date = "2017-07-14"
utc_offset_minutes = 480
jobs = ["inbound"]

[site]
hosts = ["www.example.com"]

[[inbound]]
pattern = "www.baidu.com"
id = 3
"#
    )
    .unwrap();

    let config = JobConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    let deps = config.mapper_deps().unwrap();
    let jobs = config.job_kinds().unwrap();
    assert_eq!(jobs, vec![JobKind::Inbound]);

    let pipeline = Pipeline::new(jobs[0], deps).unwrap();
    let mut sink = JsonLinesSink::new(Vec::new());
    let report = pipeline
        .run(
            &[pageview("u1", "s1", "http://www.baidu.com/")],
            &InMemoryDimensionConverter::new(),
            &mut sink,
        )
        .unwrap();
    assert_eq!(report.total_rows(), 4);

    let out = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    let first: serde_json::Value = serde_json::from_str(out.lines().next().unwrap()).unwrap();
    assert_eq!(first["table"], "stats_inbound");
    assert_eq!(first["params"][5], "2017-07-14");
}
