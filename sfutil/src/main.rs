use clap::{ArgEnum, Parser};
use geozero::error::Result;
use geozero::geojson::{GeoJson, GeoJsonWriter};
use geozero::{GeozeroDatasource, GeozeroGeometry};
use simple_features::{
    decode_ewkt, decode_hex_ewkb, decode_wkt, FieldDef, Geometry, ShapeFile,
};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Input path, required for shapefiles
    #[clap(short, long)]
    input: Option<String>,

    /// Input format
    #[clap(long, arg_enum, default_value_t = InputFormat::Ewkt)]
    inputformat: InputFormat,

    /// Output path
    #[clap(short, long)]
    output: Option<String>,

    /// Output format
    #[clap(long, arg_enum, default_value_t = OutputFormat::Geojson)]
    outputformat: OutputFormat,

    /// Print shapefile header and fields instead of converting
    #[clap(long)]
    info: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum InputFormat {
    Wkt,
    Ewkt,
    /// Hex encoded EWKB
    Ewkb,
    Geojson,
    Shapefile,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ArgEnum)]
enum OutputFormat {
    Wkt,
    Ewkt,
    /// Hex encoded EWKB
    Ewkb,
    Geojson,
}

/// One geometry per non-empty line, GeoJSON as a single document
fn read_geometries(format: InputFormat, mut input: impl BufRead) -> Result<Vec<Geometry>> {
    if format == InputFormat::Geojson {
        let mut json = String::new();
        input.read_to_string(&mut json)?;
        return Geometry::from_geozero(&GeoJson(&json)).map(|g| vec![g]);
    }
    let mut geometries = Vec::new();
    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let geom = match format {
            InputFormat::Wkt => decode_wkt(line)?,
            InputFormat::Ewkb => decode_hex_ewkb(line)?,
            _ => decode_ewkt(line)?,
        };
        geometries.push(geom);
    }
    Ok(geometries)
}

fn write_geometry(format: OutputFormat, geom: &Geometry, output: &mut impl Write) -> Result<()> {
    match format {
        OutputFormat::Wkt => writeln!(output, "{}", geom.as_wkt())?,
        OutputFormat::Ewkt => writeln!(output, "{}", geom.as_ewkt())?,
        OutputFormat::Ewkb => writeln!(output, "{}", geom.as_hex_ewkb())?,
        OutputFormat::Geojson => {
            geom.process_geom(&mut GeoJsonWriter::new(&mut *output))?;
            writeln!(output)?;
        }
    }
    Ok(())
}

fn write_shapefile(format: OutputFormat, mut shp: ShapeFile, mut output: impl Write) -> Result<()> {
    if format == OutputFormat::Geojson {
        let mut writer = GeoJsonWriter::new(&mut output);
        return shp.process(&mut writer);
    }
    for i in 0..shp.record_count() {
        match shp.record(i)?.geometry() {
            Some(geom) => write_geometry(format, geom, &mut output)?,
            None => writeln!(output)?,
        }
    }
    Ok(())
}

fn write_info(shp: &ShapeFile, mut output: impl Write) -> Result<()> {
    let header = shp.header();
    writeln!(output, "Shape type: {:?}", shp.shape_type())?;
    writeln!(output, "Records: {}", shp.record_count())?;
    writeln!(output, "Bounds: {:?}", header.bbox())?;
    if shp.shape_type().has_z() {
        writeln!(output, "Z range: {:?}", header.z_range())?;
    }
    writeln!(output, "Fields:")?;
    for FieldDef {
        name,
        field_type,
        length,
        decimal,
    } in shp.fields()
    {
        writeln!(output, "  {name} {field_type:?}({length},{decimal})")?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let output: Box<dyn Write> = match &args.output {
        Some(x) => Box::new(BufWriter::new(File::create(x)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    if args.inputformat == InputFormat::Shapefile {
        let path = args.input.as_deref().unwrap_or_else(|| {
            eprintln!("Shapefile input needs --input");
            std::process::exit(2)
        });
        let shp = ShapeFile::open(path)?;
        return if args.info {
            write_info(&shp, output)
        } else {
            write_shapefile(args.outputformat, shp, output)
        };
    }

    let input: Box<dyn BufRead> = match &args.input {
        Some(x) => Box::new(BufReader::new(File::open(x)?)),
        None => Box::new(BufReader::new(std::io::stdin())),
    };
    let mut output = output;
    for geom in read_geometries(args.inputformat, input)? {
        write_geometry(args.outputformat, &geom, &mut output)?;
    }
    output.flush()?;
    Ok(())
}
