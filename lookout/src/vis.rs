use anyhow::Result;
use rerun::{Boxes3D, Color, RecordingStream, RecordingStreamBuilder};
use tagwatch::{Publish, VisualizationMarker};

/// Shows markers in a rerun viewer, one entity per namespace and id.
pub struct Rerun {
    rec: RecordingStream,
}

impl Rerun {
    pub fn spawn(app_id: &str) -> Result<Self> {
        let rec = RecordingStreamBuilder::new(app_id).spawn()?;
        Ok(Rerun { rec })
    }
}

impl Publish<VisualizationMarker> for Rerun {
    fn publish(&mut self, marker: &VisualizationMarker) -> Result<()> {
        let p = marker.position;
        let s = marker.scale;
        let c = marker.color;
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        self.rec.log(
            format!("{}/{}/{}", marker.frame, marker.namespace, marker.id),
            &Boxes3D::from_centers_and_half_sizes(
                [[p.x as f32, p.y as f32, p.z as f32]],
                [[s.x as f32 / 2.0, s.y as f32 / 2.0, s.z as f32 / 2.0]],
            )
            .with_colors([Color::from_unmultiplied_rgba(
                channel(c.r),
                channel(c.g),
                channel(c.b),
                channel(c.a),
            )])
            .with_labels([marker.id.to_string()]),
        )?;
        Ok(())
    }
}
