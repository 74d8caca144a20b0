//! Definition and configuration fixtures shared by unit and integration tests

use crate::config::{JobConf, BUNDLE_APP_PATH, COORD_APP_PATH, GROUP_NAME, LOG_TOKEN, USER_NAME};

/// Hourly coordinator reading one hourly dataset
pub const HOURLY_COORDINATOR: &str = r#"<coordinator-app name="hourly-${prefix}" frequency="${coord:hours(1)}"
    start="2024-01-01T00:00Z" end="2024-01-02T00:00Z" timezone="UTC"
    xmlns="uri:oozie:coordinator:0.2">
  <controls>
    <concurrency>2</concurrency>
  </controls>
  <datasets>
    <dataset name="logs" frequency="60" initial-instance="2023-01-01T00:00Z" timezone="UTC">
      <uri-template>/logs/${YEAR}/${MONTH}</uri-template>
    </dataset>
  </datasets>
  <input-events>
    <data-in name="input" dataset="logs">
      <instance>${coord:current(0)}</instance>
    </data-in>
  </input-events>
  <action>
    <workflow>
      <app-path>${appBase}/wf</app-path>
    </workflow>
  </action>
</coordinator-app>"#;

/// Dataset file meant to be pulled in with `<include>`
pub const SHARED_DATASETS: &str = r#"<datasets xmlns="uri:oozie:coordinator:0.2">
  <dataset name="logs" frequency="1440" initial-instance="2020-01-01T00:00Z" timezone="UTC">
    <uri-template>/shared/logs/${YEAR}</uri-template>
  </dataset>
  <dataset name="clicks" frequency="60" initial-instance="2020-01-01T00:00Z" timezone="UTC">
    <uri-template>/shared/clicks/${YEAR}/${MONTH}/${DAY}/${HOUR}</uri-template>
  </dataset>
</datasets>"#;

/// Bundle with two coordinators sharing one definition
pub const NIGHTLY_BUNDLE: &str = r#"<bundle-app name="nightly" xmlns="uri:oozie:bundle:0.1">
  <controls>
    <kick-off-time>2024-01-01T00:00Z</kick-off-time>
  </controls>
  <coordinator name="C1">
    <app-path>${appBase}/coord/coordinator.xml</app-path>
    <configuration>
      <property><name>prefix</name><value>c1</value></property>
    </configuration>
  </coordinator>
  <coordinator name="C2">
    <app-path>${appBase}/coord/coordinator.xml</app-path>
  </coordinator>
</bundle-app>"#;

fn base_conf() -> JobConf {
    let mut conf = JobConf::new();
    conf.set(USER_NAME, "alice");
    conf.set(GROUP_NAME, "staff");
    conf.set(LOG_TOKEN, "test-token");
    conf.set("appBase", "hdfs://nn/apps");
    conf
}

/// Submission configuration for a coordinator stored at `app_path`
pub fn coordinator_conf(app_path: &str) -> JobConf {
    let mut conf = base_conf();
    conf.set(COORD_APP_PATH, app_path);
    conf.set("prefix", "job");
    conf
}

/// Submission configuration for a bundle stored at `app_path`
pub fn bundle_conf(app_path: &str) -> JobConf {
    let mut conf = base_conf();
    conf.set(BUNDLE_APP_PATH, app_path);
    conf
}

/// Hadoop-style configuration XML from key/value pairs
pub fn configuration_xml(pairs: &[(&str, &str)]) -> String {
    pairs.iter().copied().collect::<JobConf>().to_xml()
}
