use super::{GraphDef, Summary};
use crate::schema::{Emit, FieldDesc, Kind, MessageDesc, Schema, Slot, Value};

/// One record of an event file.
///
/// `what` carries at most one payload: the file format version (first
/// record of a file), a graph, or a summary.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Event {
    /// Seconds since the epoch.
    pub wall_time: f64,
    pub step: i64,
    pub what: Option<event::What>,
}

pub mod event {
    use super::{GraphDef, Summary};

    #[derive(Clone, PartialEq, Debug)]
    pub enum What {
        FileVersion(String),
        GraphDef(GraphDef),
        Summary(Summary),
    }
}

static EVENT: MessageDesc = MessageDesc {
    name: "tensorflow.Event",
    fields: &[
        FieldDesc::optional(1, "wall_time", Kind::Double),
        FieldDesc::optional(2, "step", Kind::Int64),
        FieldDesc::oneof(3, "file_version", Kind::String, "what"),
        FieldDesc::oneof(4, "graph_def", Kind::Message, "what"),
        FieldDesc::oneof(5, "summary", Kind::Message, "what"),
    ],
};

impl Schema for Event {
    fn schema(&self) -> &'static MessageDesc {
        &EVENT
    }

    fn fields(&self, out: &mut Emit<'_>) {
        use event::What;
        out.scalar(1, Value::Double(self.wall_time));
        out.scalar(2, Value::Int64(self.step));
        match &self.what {
            Some(What::FileVersion(v)) => out.oneof(3, Value::String(v)),
            Some(What::GraphDef(g)) => out.oneof(4, Value::Message(g)),
            Some(What::Summary(s)) => out.oneof(5, Value::Message(s)),
            None => (),
        }
    }

    fn slot(&mut self, number: u32) -> Option<Slot<'_>> {
        use event::What;
        let fresh = match number {
            1 => return Some(Slot::Double(&mut self.wall_time)),
            2 => return Some(Slot::Int64(&mut self.step)),
            3 => What::FileVersion(String::new()),
            4 => What::GraphDef(Default::default()),
            5 => What::Summary(Default::default()),
            _ => return None,
        };
        Some(match self.what.insert(fresh) {
            What::FileVersion(v) => Slot::String(v),
            What::GraphDef(g) => Slot::Message(g),
            What::Summary(s) => Slot::Message(s),
        })
    }
}

impl Event {
    /// The file version, or `""` when `what` holds something else.
    pub fn file_version(&self) -> &str {
        match &self.what {
            Some(event::What::FileVersion(v)) => v,
            _ => "",
        }
    }

    pub fn graph_def(&self) -> Option<&GraphDef> {
        match &self.what {
            Some(event::What::GraphDef(g)) => Some(g),
            _ => None,
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match &self.what {
            Some(event::What::Summary(s)) => Some(s),
            _ => None,
        }
    }

    pub fn set_file_version(&mut self, version: impl Into<String>) {
        self.what = Some(event::What::FileVersion(version.into()))
    }

    pub fn set_graph_def(&mut self, graph: GraphDef) {
        self.what = Some(event::What::GraphDef(graph))
    }

    pub fn set_summary(&mut self, summary: Summary) {
        self.what = Some(event::What::Summary(summary))
    }
}
