/// Named output templates. Adding a variant without a source is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    ConnectedNodes,
    ConnectedNodesVerbose,
    AvailableBackups,
    AvailableStorages,
    Version,
}

impl Template {
    pub const ALL: [Template; 5] = [
        Template::ConnectedNodes,
        Template::ConnectedNodesVerbose,
        Template::AvailableBackups,
        Template::AvailableStorages,
        Template::Version,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Template::ConnectedNodes => "connected_nodes",
            Template::ConnectedNodesVerbose => "connected_nodes_verbose",
            Template::AvailableBackups => "available_backups",
            Template::AvailableStorages => "available_storages",
            Template::Version => "version",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Template::ConnectedNodes => CONNECTED_NODES,
            Template::ConnectedNodesVerbose => CONNECTED_NODES_VERBOSE,
            Template::AvailableBackups => AVAILABLE_BACKUPS,
            Template::AvailableStorages => AVAILABLE_STORAGES,
            Template::Version => VERSION,
        }
    }
}

// Context: `clients` (list of AgentRecord)
const CONNECTED_NODES: &str = r#"{{ "Node Name"|pad(30) }} {{ "Cluster ID"|pad(26) }} {{ "Replicaset"|pad(20) }} Status
{% for c in clients %}
{{ c.node_name|pad(30) }} {{ c.cluster_id|pad(26) }} {{ c.replicaset_name|pad(20) }} {{ c.status }}
{% endfor %}
"#;

// Context: `clients` (list of AgentRecord)
const CONNECTED_NODES_VERBOSE: &str = r#"{% for c in clients %}
Node Name         : {{ c.node_name }}
Node ID           : {{ c.id }}
Node Type         : {{ c.node_type }}
Agent Version     : {{ c.version }}
Cluster ID        : {{ c.cluster_id }}
Replicaset Name   : {{ c.replicaset_name }}
Replicaset ID     : {{ c.replicaset_id }}
Status            : {{ c.status }}
Last Command Sent : {{ c.last_command_sent }}
Last Seen         : {{ c.last_seen }}

{% endfor %}
"#;

// Context: `backups` (filename -> BackupRecord, sorted by filename)
const AVAILABLE_BACKUPS: &str = r#"{{ "Metadata file name"|pad(40) }} - Description
{% for name, md in backups|items %}
{{ name|pad(40) }} - {{ md.description }} ({{ md.backup_type }}, {{ md.compression }}, {% if md.completed %}completed {{ md.end_time }}{% else %}started {{ md.start_time }}, not completed{% endif %})
{% endfor %}
"#;

// Context: `storages` (list of StorageDescriptor, server order)
const AVAILABLE_STORAGES: &str = r#"Available Storages:
{% for s in storages %}
-------------------------------------------------------------------------------------------------
Name      : {{ s.name }}
Type      : {{ s.kind }}
Location  : {{ s.location }}
Valid     : {{ s.valid }}
Can Read  : {{ s.can_read }}
Can Write : {{ s.can_write }}
{% endfor %}
"#;

// Context: `version`, `commit`, `build`, `branch`, `rust_version`
const VERSION: &str = r#"Version     : {{ version }}
Commit      : {{ commit }}
Build       : {{ build }}
Branch      : {{ branch }}
Rust version: {{ rust_version }}
"#;
